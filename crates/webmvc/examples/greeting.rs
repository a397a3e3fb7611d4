use bytes::Bytes;
use http::{Request, header};
use http_body_util::BodyExt;
use micro_webmvc::convert::NamedEnum;
use micro_webmvc::responder::Json;
use micro_webmvc::{
    AppConfig, Application, Args, BoxError, ClientError, Constraints, Controller, FieldSpec, HandlerDescriptor,
    ParamSpec, Record, RequestContext, ResponseBody,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Deserialize, Serialize)]
struct Greeting {
    to: String,
    times: u8,
}

impl Record for Greeting {
    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::scalar::<String>("to").with(Constraints::default().size(32)),
            FieldSpec::scalar::<u8>("times").with(Constraints::default().default_value("1").min(1).max(5)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Plain,
    Loud,
}

impl NamedEnum for Tone {
    fn variants() -> &'static [Self] {
        &[Tone::Plain, Tone::Loud]
    }

    fn name(&self) -> &'static str {
        match self {
            Tone::Plain => "PLAIN",
            Tone::Loud => "LOUD",
        }
    }
}

#[derive(Default)]
struct GreetingController {
    served: AtomicU64,
}

impl GreetingController {
    // curl 'http://127.0.0.1:8080/greeting/hi?msg=2026&tone=LOUD'
    fn hi(&self, _ctx: &mut RequestContext, mut args: Args) -> Result<String, BoxError> {
        self.served.fetch_add(1, Ordering::Relaxed);
        let msg = args.take::<i64>("msg")?;
        let tone = args.take_enum::<Tone>("tone")?.unwrap_or(Tone::Plain);
        let text = format!("hi {msg}");
        Ok(if tone == Tone::Loud { text.to_uppercase() } else { text })
    }

    // curl -H 'Content-Type: application/json' -d '{"to":"zava","times":2}' http://127.0.0.1:8080/greeting/send
    fn send(&self, _ctx: &mut RequestContext, mut args: Args) -> Result<Json<Vec<String>>, BoxError> {
        self.served.fetch_add(1, Ordering::Relaxed);
        let greeting = args.take_record::<Greeting>("greeting")?.ok_or_else(|| ClientError::message("no greeting"))?;
        Ok(Json((0..greeting.times).map(|_| format!("hello {}", greeting.to)).collect()))
    }

    fn stats(&self, _ctx: &mut RequestContext, _args: Args) -> Result<u64, BoxError> {
        Ok(self.served.load(Ordering::Relaxed))
    }
}

async fn show(name: &str, response: http::Response<ResponseBody>) {
    let status = response.status();
    match response.into_body().collect().await {
        Ok(body) => info!(name, status = status.as_u16(), body = ?body.to_bytes(), "response"),
        Err(e) => error!(name, cause = %e, "read body error"),
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let controller = Controller::<GreetingController>::new()
        .prefix("/greeting")
        .handler(
            HandlerDescriptor::get("/hi").content_type("text/plain; charset=utf-8"),
            [
                ParamSpec::scalar::<i64>("msg").with(Constraints::default().rule("\\d{1,4}")),
                ParamSpec::enumeration::<Tone>("tone").with(Constraints::default().required(false)),
            ],
            GreetingController::hi,
        )
        .handler(
            HandlerDescriptor::post("/send"),
            [ParamSpec::record::<Greeting>("greeting")],
            GreetingController::send,
        )
        .handler(HandlerDescriptor::get("/stats"), [ParamSpec::context()], GreetingController::stats);

    let config = match AppConfig::from_json_str(r#"{"defaultContentType": "application/json; charset=utf-8"}"#) {
        Ok(config) => config,
        Err(e) => {
            error!(cause = %e, "invalid config");
            return;
        }
    };

    let app = match Application::builder().config(config).controller(controller).build() {
        Ok(app) => app,
        Err(e) => {
            error!(cause = %e, "build application error");
            return;
        }
    };

    let hi = Request::get("/greeting/hi?msg=2026&tone=LOUD").body(Bytes::new()).expect("valid request");
    show("hi", app.dispatch(hi)).await;
    let bad = Request::get("/greeting/hi?msg=20260").body(Bytes::new()).expect("valid request");
    show("bad msg", app.dispatch(bad)).await;

    let send = Request::post("/greeting/send")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from_static(br#"{"to":"zava","times":2}"#))
        .expect("valid request");
    show("send", app.dispatch(send)).await;

    show("stats", app.dispatch(Request::get("/greeting/stats").body(Bytes::new()).expect("valid request"))).await;
    show("missing", app.dispatch(Request::get("/greeting/bye").body(Bytes::new()).expect("valid request"))).await;
}
