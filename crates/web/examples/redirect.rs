use ember_web::router::PathArgs;
use ember_web::{Application, HandlerResult, Request, Response, Route, Server};

async fn old_post(_request: &Request, response: &mut Response, args: &PathArgs) -> HandlerResult {
    response.redirect(&format!("/post/{}", args.nth(0).unwrap_or_default()), true)?;
    Ok(())
}

async fn post(_request: &Request, response: &mut Response, args: &PathArgs) -> HandlerResult {
    response.write(format!("post {}", args.nth(0).unwrap_or_default()));
    Ok(())
}

async fn login(_request: &Request, response: &mut Response, _args: &PathArgs) -> HandlerResult {
    response.redirect("/post/1", false)?;
    Ok(())
}

// curl -v http://127.0.0.1:3000/archive/42
#[tokio::main]
async fn main() {
    let application = Application::builder()
        .route(Route::get(r"/archive/(\d+)", old_post))
        .route(Route::get(r"/post/(\d+)", post).name("post"))
        .get("/login", login)
        .build()
        .unwrap();

    if let Ok(url) = application.reverse_url("post", &["1"]) {
        println!("first post lives at {url}");
    }

    Server::builder().application(application).address("127.0.0.1:3000").build().unwrap().start().await.unwrap();
}
