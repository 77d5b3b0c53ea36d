//! End-to-end routing behavior, driven through `Router::respond` with plain
//! `hyper` requests.

use std::sync::{Arc, Mutex};

use junction::helpers::http::header::{X_FORWARDED_METHOD, X_FORWARDED_PATH, X_ORIGINAL_PATH};
use junction::helpers::http::response::{create_empty_response, create_response};
use junction::hyper::header::{HeaderName, HeaderValue, ALLOW};
use junction::hyper::{Body, Method, Request, Response, StatusCode};
use junction::prelude::*;
use junction::router::FallbackStatus;

fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

fn get(path: &str) -> Request<Body> {
    request(Method::GET, path)
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = junction::hyper::body::to_bytes(response.into_body())
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

type Recorder = Arc<Mutex<Vec<&'static str>>>;

fn recording_handler(
    recorder: &Recorder,
    label: &'static str,
    outcome_of: fn(&Context) -> Outcome,
) -> impl RouteHandler {
    let recorder = recorder.clone();
    move |ctx: Context| {
        let recorder = recorder.clone();
        async move {
            recorder.lock().unwrap().push(label);
            let outcome = outcome_of(&ctx);
            Ok((ctx, outcome))
        }
    }
}

fn continuing(recorder: &Recorder, label: &'static str) -> impl RouteHandler {
    recording_handler(recorder, label, |_| Outcome::Continue)
}

#[tokio::test]
async fn path_parameters_are_captured() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /users/:id", |ctx: Context| async move {
            let body = format!("u:{}", ctx.params().get("id").unwrap());
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, body);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/users/42")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "u:42");
}

#[tokio::test]
async fn handler_free_router_responds_404() {
    let router = RouterBuilder::new().finish();
    let response = router.respond(get("/anything/at/all")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn matched_path_with_wrong_method_responds_405_with_allow() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("POST /things", |ctx: Context| async move {
            let res = create_empty_response(&ctx, StatusCode::CREATED);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/things")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get(ALLOW).unwrap(), "POST");
}

#[tokio::test]
async fn all_routes_respond_to_every_method_crud_to_five() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("ALL /all", |ctx: Context| async move {
            let res = create_empty_response(&ctx, StatusCode::OK);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .handle("CRUD /crud", |ctx: Context| async move {
            let res = create_empty_response(&ctx, StatusCode::OK);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    for method in [
        Method::HEAD,
        Method::OPTIONS,
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ] {
        let response = router.respond(request(method.clone(), "/all")).await;
        assert_eq!(response.status(), StatusCode::OK, "ALL should accept {}", method);
    }

    for method in [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ] {
        let response = router.respond(request(method.clone(), "/crud")).await;
        assert_eq!(response.status(), StatusCode::OK, "CRUD should accept {}", method);
    }
    for method in [Method::HEAD, Method::OPTIONS] {
        let response = router.respond(request(method.clone(), "/crud")).await;
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "CRUD should refuse {}",
            method
        );
    }
}

#[tokio::test]
async fn categories_run_in_order_and_handlers_in_insertion_order() {
    let order: Recorder = Arc::new(Mutex::new(Vec::new()));

    let mut builder = RouterBuilder::new();
    builder
        .after("GET /x", continuing(&order, "after"))
        .unwrap()
        .handle("GET /x", recording_handler(&order, "handler", |_| Outcome::Continue))
        .unwrap()
        .hook("GET /x", continuing(&order, "hook"))
        .unwrap()
        .register_pipeline(
            "GET /x",
            Category::Filter,
            vec![
                Arc::new(continuing(&order, "filter-1")),
                Arc::new(continuing(&order, "filter-2")),
            ],
            false,
        )
        .unwrap()
        .fallback("GET /x", recording_handler(&order, "fallback", |_| Outcome::Continue))
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/x")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        *order.lock().unwrap(),
        vec!["hook", "filter-1", "filter-2", "handler", "fallback", "after"]
    );
}

#[tokio::test]
async fn more_specific_matches_run_first_within_a_category() {
    let order: Recorder = Arc::new(Mutex::new(Vec::new()));

    let mut builder = RouterBuilder::new();
    builder
        .hook("GET /.**", continuing(&order, "glob-hook"))
        .unwrap()
        .hook("GET /a/b", continuing(&order, "exact-hook"))
        .unwrap()
        .hook("GET /a/:x", continuing(&order, "param-hook"))
        .unwrap();
    let router = builder.finish();

    router.respond(get("/a/b")).await;
    assert_eq!(
        *order.lock().unwrap(),
        vec!["exact-hook", "param-hook", "glob-hook"]
    );
}

#[tokio::test]
async fn exact_handler_wins_over_parent_glob() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /.**", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "glob");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .handle("GET /x", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "exact");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    assert_eq!(body_text(router.respond(get("/x")).await).await, "exact");
    assert_eq!(body_text(router.respond(get("/y")).await).await, "glob");
}

#[tokio::test]
async fn a_response_from_a_filter_skips_handlers_but_not_afters() {
    let order: Recorder = Arc::new(Mutex::new(Vec::new()));

    let mut builder = RouterBuilder::new();
    builder
        .filter("GET /x", {
            let order = order.clone();
            move |ctx: Context| {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push("filter");
                    let res = create_empty_response(&ctx, StatusCode::FORBIDDEN);
                    Ok((ctx, Outcome::Respond(res)))
                }
            }
        })
        .unwrap()
        .handle("GET /x", continuing(&order, "handler"))
        .unwrap()
        .after("GET /x", {
            let order = order.clone();
            move |mut ctx: Context| {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push("after");
                    if let Some(response) = ctx.response_mut() {
                        response
                            .headers_mut()
                            .insert("x-seen-by-after", HeaderValue::from_static("yes"));
                    }
                    Ok((ctx, Outcome::Continue))
                }
            }
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/x")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers().get("x-seen-by-after").unwrap(), "yes");
    assert_eq!(*order.lock().unwrap(), vec!["filter", "after"]);
}

#[tokio::test]
async fn stop_halts_the_category_but_not_the_pipeline() {
    let order: Recorder = Arc::new(Mutex::new(Vec::new()));

    let mut builder = RouterBuilder::new();
    builder
        .filter("GET /s/x", recording_handler(&order, "exact-filter", |_| Outcome::Stop))
        .unwrap()
        .filter("GET /s/**", continuing(&order, "glob-filter"))
        .unwrap()
        .handle("GET /s/x", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "handled");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/s/x")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "handled");
    assert_eq!(*order.lock().unwrap(), vec!["exact-filter"]);
}

#[tokio::test]
async fn hook_responses_are_ignored() {
    let mut builder = RouterBuilder::new();
    builder
        .hook("GET /x", |ctx: Context| async move {
            let res = create_empty_response(&ctx, StatusCode::INTERNAL_SERVER_ERROR);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .handle("GET /x", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "ok");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/x")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn after_can_replace_the_response_but_not_return_one() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /x", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "original");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .after("GET /x", |mut ctx: Context| async move {
            let replacement =
                create_response(&ctx, StatusCode::ACCEPTED, mime::TEXT_PLAIN, "replaced");
            ctx.set_response(replacement);
            // The returned response must be ignored; only the slot counts.
            let ignored = create_empty_response(&ctx, StatusCode::IM_A_TEAPOT);
            Ok((ctx, Outcome::Respond(ignored)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/x")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_text(response).await, "replaced");
}

#[tokio::test]
async fn no_response_synthesizes_204() {
    let mut builder = RouterBuilder::new();
    builder
        .hook("GET /quiet", |ctx: Context| async move { Ok((ctx, Outcome::Continue)) })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/quiet")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn filter_error_diverts_to_the_route_catcher() {
    let mut builder = RouterBuilder::new();
    builder
        .filter("GET /boom", |ctx: Context| async move {
            Err((ctx, junction::handler::HandlerError::msg("boom")))
        })
        .unwrap()
        .catch("GET /boom", |ctx: Context| async move {
            let message = ctx.error().map(|e| e.cause().to_string()).unwrap_or_default();
            let body = format!("{{\"ok\":false,\"e\":\"{}\"}}", message);
            let res = create_response(
                &ctx,
                StatusCode::INTERNAL_SERVER_ERROR,
                mime::APPLICATION_JSON,
                body,
            );
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/boom")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(body_text(response).await, "{\"ok\":false,\"e\":\"boom\"}");
}

#[tokio::test]
async fn a_failing_catcher_falls_through_to_the_default_catcher() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /boom", |ctx: Context| async move {
            Err((ctx, junction::handler::HandlerError::msg("first")))
        })
        .unwrap()
        .catch("GET /boom", |ctx: Context| async move {
            Err((ctx, junction::handler::HandlerError::msg("catcher died")))
        })
        .unwrap();
    builder.default_catcher(|ctx: Context| async move {
        let res = create_response(
            &ctx,
            StatusCode::BAD_GATEWAY,
            mime::TEXT_PLAIN,
            "default catcher",
        );
        Ok((ctx, Outcome::Respond(res)))
    });
    let router = builder.finish();

    let response = router.respond(get("/boom")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_text(response).await, "default catcher");
}

#[tokio::test]
async fn a_failing_default_catcher_synthesizes_500() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /boom", |ctx: Context| async move {
            Err((ctx, junction::handler::HandlerError::msg("first")))
        })
        .unwrap();
    builder.default_catcher(|ctx: Context| async move {
        Err((ctx, junction::handler::HandlerError::msg("second")))
    });
    let router = builder.finish();

    let response = router.respond(get("/boom")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unhandled_errors_use_the_error_status() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /teapot", |ctx: Context| async move {
            let err = junction::handler::HandlerError::msg("short and stout")
                .with_status(StatusCode::IM_A_TEAPOT);
            Err((ctx, err))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/teapot")).await;
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
}

#[tokio::test]
async fn duplicate_registration_requires_overwrite() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /dup", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "one");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();

    let duplicate = builder.handle("GET /dup", |ctx: Context| async move {
        let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "two");
        Ok((ctx, Outcome::Respond(res)))
    });
    assert!(matches!(duplicate, Err(SetupError::DuplicateRoute { .. })));

    builder
        .register(
            "GET /dup",
            Category::Handler,
            |ctx: Context| async move {
                let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "two");
                Ok((ctx, Outcome::Respond(res)))
            },
            true,
        )
        .unwrap();
    let router = builder.finish();

    assert_eq!(body_text(router.respond(get("/dup")).await).await, "two");
}

#[tokio::test]
async fn different_categories_do_not_collide() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /x", |ctx: Context| async move {
            let res = create_empty_response(&ctx, StatusCode::OK);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .filter("GET /x", |ctx: Context| async move { Ok((ctx, Outcome::Continue)) })
        .unwrap()
        .hook("GET /x", |ctx: Context| async move { Ok((ctx, Outcome::Continue)) })
        .unwrap();
}

#[tokio::test]
async fn trailing_slash_routes_are_distinct_by_default() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /api", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "bare");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .handle("GET /api/", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "slashed");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    assert_eq!(body_text(router.respond(get("/api")).await).await, "bare");
    assert_eq!(body_text(router.respond(get("/api/")).await).await, "slashed");
}

#[tokio::test]
async fn normalization_collapses_trailing_slashes() {
    let mut builder = RouterBuilder::new();
    builder.normalize_trailing_slash(true);
    builder
        .handle("GET /api", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "api");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();

    let duplicate = builder.handle("GET /api/", |ctx: Context| async move {
        Ok((ctx, Outcome::Continue))
    });
    assert!(matches!(duplicate, Err(SetupError::DuplicateRoute { .. })));

    let router = builder.finish();
    assert_eq!(body_text(router.respond(get("/api")).await).await, "api");
    assert_eq!(body_text(router.respond(get("/api/")).await).await, "api");
}

#[tokio::test]
async fn composition_copies_routes_but_not_configuration() {
    let mut child = RouterBuilder::new();
    child
        .handle("GET /users", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "u-list");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    child.default_headers(vec![(
        HeaderName::from_static("x-child-header"),
        HeaderValue::from_static("should-not-appear"),
    )]);

    let mut parent = RouterBuilder::new();
    parent.append("/api", child).unwrap();
    let router = parent.finish();

    let response = router.respond(get("/api/users")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-child-header").is_none());
    assert_eq!(body_text(response).await, "u-list");

    // The child's routes exist only under the prefix.
    let response = router.respond(get("/users")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn composition_preserves_wildcards_and_params() {
    let mut child = RouterBuilder::new();
    child
        .handle("GET /users/:id", |ctx: Context| async move {
            let body = format!("u:{}", ctx.params().get("id").unwrap());
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, body);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .handle("GET /files/**", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "deep");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();

    let mut parent = RouterBuilder::new();
    parent.append("/v1", child).unwrap();
    let router = parent.finish();

    assert_eq!(
        body_text(router.respond(get("/v1/users/7")).await).await,
        "u:7"
    );
    assert_eq!(
        body_text(router.respond(get("/v1/files/a/b/c")).await).await,
        "deep"
    );
}

#[tokio::test]
async fn append_rejects_colliding_routes() {
    let mut child = RouterBuilder::new();
    child
        .handle("GET /users", |ctx: Context| async move { Ok((ctx, Outcome::Continue)) })
        .unwrap();

    let mut parent = RouterBuilder::new();
    parent
        .handle("GET /api/users", |ctx: Context| async move { Ok((ctx, Outcome::Continue)) })
        .unwrap();

    assert!(matches!(
        parent.append("/api", child),
        Err(SetupError::DuplicateRoute { .. })
    ));
}

#[tokio::test]
async fn default_headers_apply_without_clobbering() {
    let mut builder = RouterBuilder::new();
    builder.default_headers(vec![
        (
            HeaderName::from_static("x-powered-by"),
            HeaderValue::from_static("junction"),
        ),
        (
            HeaderName::from_static("x-kept"),
            HeaderValue::from_static("default"),
        ),
    ]);
    builder
        .handle("GET /x", |ctx: Context| async move {
            let mut res = create_empty_response(&ctx, StatusCode::OK);
            res.headers_mut()
                .insert("x-kept", HeaderValue::from_static("handler"));
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/x")).await;
    assert_eq!(response.headers().get("x-powered-by").unwrap(), "junction");
    assert_eq!(response.headers().get("x-kept").unwrap(), "handler");
}

#[tokio::test]
async fn default_fallback_sees_the_synthesized_status() {
    let mut builder = RouterBuilder::new();
    builder.default_fallback(|ctx: Context| async move {
        let status = ctx.borrow::<FallbackStatus>().0;
        let res = create_response(
            &ctx,
            status,
            mime::TEXT_PLAIN,
            format!("fallback:{}", status.as_u16()),
        );
        Ok((ctx, Outcome::Respond(res)))
    });
    builder
        .hook("GET /quiet", |ctx: Context| async move { Ok((ctx, Outcome::Continue)) })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "fallback:404");

    let response = router.respond(get("/quiet")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(body_text(response).await, "fallback:204");
}

#[tokio::test]
async fn disabled_categories_are_skipped() {
    let mut builder = RouterBuilder::new();
    builder.disable(Category::Filter);
    builder
        .filter("GET /x", |ctx: Context| async move {
            let res = create_empty_response(&ctx, StatusCode::UNAUTHORIZED);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .handle("GET /x", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "open");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/x")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "open");
}

#[tokio::test]
async fn forward_re_dispatches_with_forwarding_headers() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /alias", |ctx: Context| ctx.forward("/real"))
        .unwrap()
        .handle("GET /real", |ctx: Context| async move {
            let forwarded = ctx
                .headers()
                .get(X_FORWARDED_PATH)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let original = ctx
                .headers()
                .get(X_ORIGINAL_PATH)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let res = create_response(
                &ctx,
                StatusCode::OK,
                mime::TEXT_PLAIN,
                format!("{}|{}", forwarded, original),
            );
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/alias")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "/real|/alias");
}

#[tokio::test]
async fn forward_can_override_the_method() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /submit-alias", |ctx: Context| {
            ctx.forward_with("/submit", Some(Method::POST))
        })
        .unwrap()
        .handle("POST /submit", |ctx: Context| async move {
            let method = ctx
                .headers()
                .get(X_FORWARDED_METHOD)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, method);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let response = router.respond(get("/submit-alias")).await;
    assert_eq!(body_text(response).await, "POST");
}

#[tokio::test]
async fn wildcard_boundaries_hold_end_to_end() {
    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /files/*", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "one");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap()
        .handle("GET /docs/.*", |ctx: Context| async move {
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, "maybe");
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    assert_eq!(router.respond(get("/files")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(router.respond(get("/files/a")).await.status(), StatusCode::OK);
    assert_eq!(
        router.respond(get("/files/a/b")).await.status(),
        StatusCode::NOT_FOUND
    );

    assert_eq!(router.respond(get("/docs")).await.status(), StatusCode::OK);
    assert_eq!(router.respond(get("/docs/a")).await.status(), StatusCode::OK);
    assert_eq!(
        router.respond(get("/docs/a/b")).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn seeded_contexts_reach_handlers() {
    struct Seed(&'static str);

    let mut builder = RouterBuilder::new();
    builder
        .handle("GET /x", |ctx: Context| async move {
            let seeded = ctx.borrow::<Seed>().0;
            let res = create_response(&ctx, StatusCode::OK, mime::TEXT_PLAIN, seeded);
            Ok((ctx, Outcome::Respond(res)))
        })
        .unwrap();
    let router = builder.finish();

    let mut ctx = Context::from_request(get("/x"));
    ctx.put(Seed("from-the-caller"));
    let (_ctx, response) = router.dispatch(ctx).await;
    assert_eq!(body_text(response).await, "from-the-caller");
}
