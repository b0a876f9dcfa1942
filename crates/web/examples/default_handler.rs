use ember_web::router::RouteSettings;
use ember_web::{Application, Context, HandlerResult, RequestHandler, Server};
use http::StatusCode;

struct Index;

#[async_trait::async_trait]
impl RequestHandler for Index {
    fn new(_settings: &RouteSettings) -> Self {
        Index
    }

    async fn get(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        cx.write("index");
        Ok(())
    }
}

struct NotFound;

#[async_trait::async_trait]
impl RequestHandler for NotFound {
    fn new(_settings: &RouteSettings) -> Self {
        NotFound
    }

    async fn prepare(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        cx.set_status(StatusCode::NOT_FOUND);
        Ok(())
    }

    async fn get(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        let path = cx.request().path();
        cx.write(format!("nothing at {path}"));
        Ok(())
    }
}

// curl -v http://127.0.0.1:3000/missing
#[tokio::main]
async fn main() {
    let application = Application::builder().handler::<Index>("/").default_handler::<NotFound>().build().unwrap();

    Server::builder().application(application).address("127.0.0.1:3000").build().unwrap().start().await.unwrap();
}
