use ember_web::router::RouteSettings;
use ember_web::{Application, Context, HandlerResult, HttpError, RequestHandler, Server};
use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct Page {
    page: u32,
    size: Option<u32>,
}

#[derive(Serialize)]
struct Listing<'a> {
    service: &'a str,
    page: u32,
    size: u32,
}

struct Items {
    service: String,
}

#[async_trait::async_trait]
impl RequestHandler for Items {
    fn new(settings: &RouteSettings) -> Self {
        Items { service: settings.get_str("service").unwrap_or("items").to_owned() }
    }

    // curl -v "http://127.0.0.1:3000/items?page=2&size=5"
    async fn get(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        let page: Page = cx.query_as()?;
        cx.write_json(&Listing { service: &self.service, page: page.page, size: page.size.unwrap_or(20) })
    }

    // curl -v -H 'Content-Type: application/json' -d '{"name":"lamp"}' http://127.0.0.1:3000/items
    async fn post(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        let Some(name) = cx.body_argument("name") else {
            return Err(HttpError::bad_request("name is required").into());
        };
        cx.set_status(StatusCode::CREATED);
        cx.write_json(&serde_json::json!({ "created": name }))
    }
}

#[tokio::main]
async fn main() {
    let application = Application::builder()
        .route(ember_web::Route::handler::<Items>("/items").setting("service", "inventory"))
        .build()
        .unwrap();

    Server::builder().application(application).address("127.0.0.1:3000").build().unwrap().start().await.unwrap();
}
