use http::StatusCode;
use http::header::CACHE_CONTROL;
use switchyard_web::{Context, Engine, EngineConfig, Server, handler_fn};
use tracing::{info, warn};

fn access_log(ctx: &mut Context) {
    ctx.next();
    let response = ctx.response();
    info!(method = %ctx.method(), path = ctx.path(), route = ctx.full_path(), status = %response.status(), "served");
}

fn reply(ctx: &mut Context, status: StatusCode, body: &str) {
    if let Err(e) = ctx.string(status, body) {
        warn!(cause = %e, path = ctx.path(), "failed to write response");
    }
}

fn hello_world(ctx: &mut Context) {
    if let Err(e) = ctx.header(CACHE_CONTROL, "no-cache") {
        warn!(cause = %e, "invalid header value");
    }
    reply(ctx, StatusCode::OK, "hello world");
}

fn hello_name(ctx: &mut Context) {
    let greeting = ctx.default_query("greeting", "hello");
    let body = format!("{greeting} {}", ctx.param("name"));
    reply(ctx, StatusCode::OK, &body);
}

fn not_found(ctx: &mut Context) {
    reply(ctx, StatusCode::NOT_FOUND, "nothing to see here");
}

#[tokio::main]
async fn main() {
    let config = EngineConfig { redirect_fixed_path: true, handle_method_not_allowed: true, ..EngineConfig::default() };
    let mut engine = Engine::with_config(config);

    engine.middleware([handler_fn(access_log)]).unwrap();
    engine.no_route([handler_fn(not_found)]).unwrap();
    engine.get("/", [handler_fn(hello_world)]).unwrap();
    {
        let mut hello = engine.group("/hello", []).unwrap();
        hello.get("/:name", [handler_fn(hello_name)]).unwrap();
    }

    Server::builder().engine(engine).address("127.0.0.1:3000").build().unwrap().start().await.unwrap();
}
