use ember_web::router::RouteSettings;
use ember_web::{Application, Context, HandlerResult, RequestHandler, Server};
use tracing::Level;

/// Echoes a request header back as a response header.
struct Headers;

#[async_trait::async_trait]
impl RequestHandler for Headers {
    fn new(_settings: &RouteSettings) -> Self {
        Headers
    }

    // curl -v -H "X-Token: abc" http://127.0.0.1:3000/
    async fn get(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        let agent = cx.header("user-agent").unwrap_or("unknown");
        cx.set_header("Content-Type", "text/plain")?;
        if let Some(token) = cx.header("X-Token") {
            cx.set_header("X-Token-Echo", token)?;
        }
        cx.write(format!("you are {agent}"));
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let application = Application::builder().handler::<Headers>("/").debug(true).build().unwrap();

    Server::builder()
        .application(application)
        .address("127.0.0.1:3000")
        .log_level(Level::DEBUG)
        .build()
        .unwrap()
        .start()
        .await
        .unwrap();
}
