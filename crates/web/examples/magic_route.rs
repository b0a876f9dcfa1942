use ember_web::router::PathArgs;
use ember_web::{Application, HandlerResult, Request, Response, Server};

async fn show(_request: &Request, response: &mut Response, args: &PathArgs) -> HandlerResult {
    response.write(format!("id: {}", args.get("id").unwrap_or_default()));
    Ok(())
}

// curl -v -d "name=ember" http://127.0.0.1:3000/2333/
async fn update(request: &Request, response: &mut Response, args: &PathArgs) -> HandlerResult {
    let name = request.argument("name").unwrap_or_else(|| "nobody".to_owned());
    response.write(format!("{} renamed to {name}", args.get("id").unwrap_or_default()));
    Ok(())
}

// curl -v "http://127.0.0.1:3000/sum?a=22&b=33"
async fn sum(request: &Request, response: &mut Response, _args: &PathArgs) -> HandlerResult {
    let a: i64 = request.query_argument("a").unwrap_or("0").parse()?;
    let b: i64 = request.query_argument("b").unwrap_or("0").parse()?;
    response.write(format!("sum: {}", a + b));
    Ok(())
}

#[tokio::main]
async fn main() {
    let application = Application::builder()
        .get("/sum", sum)
        .get("/{id}/", show)
        .post("/{id}/", update)
        .build()
        .unwrap();

    Server::builder().application(application).address("127.0.0.1:3000").build().unwrap().start().await.unwrap();
}
