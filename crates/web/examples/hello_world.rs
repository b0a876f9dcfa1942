use ember_web::router::RouteSettings;
use ember_web::{Application, Context, HandlerResult, RequestHandler, Server};

struct MainHandler;

#[async_trait::async_trait]
impl RequestHandler for MainHandler {
    fn new(_settings: &RouteSettings) -> Self {
        MainHandler
    }

    async fn get(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        cx.write("Hello World");
        Ok(())
    }
}

// curl -v http://127.0.0.1:3000/
#[tokio::main]
async fn main() {
    let application = Application::builder().handler::<MainHandler>("/").build().unwrap();

    Server::builder().application(application).address("127.0.0.1:3000").build().unwrap().start().await.unwrap();
}
