use ember_web::router::RouteSettings;
use ember_web::{Application, Context, Cookie, HandlerResult, RequestHandler, Server};

/// Counts visits in a signed cookie.
struct Visits;

#[async_trait::async_trait]
impl RequestHandler for Visits {
    fn new(_settings: &RouteSettings) -> Self {
        Visits
    }

    async fn get(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        let visits = cx.secure_cookie("visits")?.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0) + 1;
        cx.set_secure_cookie(Cookie::new("visits", visits.to_string()).path("/").http_only(true).expires_in_days(30))?;
        cx.write(format!("visit number {visits}"));
        Ok(())
    }

    async fn delete(&mut self, cx: &mut Context<'_>) -> HandlerResult {
        cx.clear_cookie("visits")?;
        cx.write("forgotten");
        Ok(())
    }
}

// curl -v -c jar -b jar http://127.0.0.1:3000/
#[tokio::main]
async fn main() {
    let application = Application::builder().handler::<Visits>("/").cookie_secret("change me").build().unwrap();

    Server::builder().application(application).address("127.0.0.1:3000").build().unwrap().start().await.unwrap();
}
