use actix_web::middleware::Logger;
use actix_web::{get, web, App, Error, HttpRequest, HttpResponse, HttpServer};
use actix_web_actors::ws;
use config::{Config, Environment, File};
use serde::Deserialize;

#[macro_use]
extern crate log;
extern crate env_logger;

mod front;
mod message_types;
mod quotes;
use self::front::FrontSession;

#[derive(Debug, Clone, Deserialize)]
pub struct FrontSettings {
    bind_address: String,
    port: u16,
    /// Artificial delay before answering a login, in milliseconds
    pub login_delay_ms: u64,
    pub tick_interval_ms: u64,
    pub require_login_for_subscribe: bool,
    /// Fixed trading day to report; today's UTC date when unset
    #[serde(default)]
    pub trading_day: Option<String>,
}

fn load_settings() -> Result<FrontSettings, config::ConfigError> {
    Config::builder()
        .set_default("bind_address", "0.0.0.0")?
        .set_default("port", 20004i64)?
        .set_default("login_delay_ms", 0i64)?
        .set_default("tick_interval_ms", 500i64)?
        .set_default("require_login_for_subscribe", false)?
        .add_source(File::with_name("configuration").required(false))
        .add_source(Environment::with_prefix("MOCK_FRONT"))
        .build()?
        .try_deserialize::<FrontSettings>()
}

#[get("/")]
async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    settings: web::Data<FrontSettings>,
) -> Result<HttpResponse, Error> {
    info!("Websocket connection received from {:?}", req.peer_addr());
    let resp = ws::start(FrontSession::new(settings.get_ref().clone()), &req, stream);
    debug!("Websocket response: {:?}", resp);
    resp
}

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let settings = load_settings()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    info!("{:?}", settings);

    let bind = (settings.bind_address.clone(), settings.port);
    let data = web::Data::new(settings);
    info!("Starting market data front on {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .service(ws_index)
    })
    .bind(bind)?
    .run()
    .await
}
