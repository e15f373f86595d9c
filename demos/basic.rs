//! A small user API.
//!
//! ```text
//! cargo run --example basic
//! curl -A demo localhost:3000/users/1
//! curl -A demo -X POST localhost:3000/users -H 'content-type: application/json' -d '{"name":"grace","email":"grace@example.com"}'
//! curl -A demo -X OPTIONS -i localhost:3000/users
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sluice::{
    App, Config, Fault, HttpError, Json, Request, Route, Router, Rules, Server, Status, Validator,
};
use tracing::info;

#[derive(Clone, Debug, Deserialize, Serialize)]
struct User {
    #[serde(default)]
    id: u64,
    name: String,
    email: String,
}

type Users = Arc<RwLock<HashMap<u64, User>>>;

#[tokio::main]
async fn main() -> Result<(), sluice::Error> {
    tracing_subscriber::fmt().with_target(false).init();

    let users: Users = Arc::default();
    let (read, write) = (Arc::clone(&users), Arc::clone(&users));

    let router = Router::new()
        .before(|req: Request| async move {
            if let Some(id) = req.header("x-request-id") {
                req.response().set_header("x-request-id", id);
            }
        })
        .get("/users/:id", move |req: Request| {
            let users = Arc::clone(&read);
            async move { find_user(&users, &req) }
        })
        .route(
            Route::post("/users", move |req: Request| {
                let users = Arc::clone(&write);
                async move { create_user(&users, &req) }
            })
            .status(Status::Created)
            .validate(
                Rules::new()
                    .body("name", Validator::new().required().is_length(1..=64))
                    .body("email", Validator::new().required().is_email()),
            )
            .on_error(|fault: Fault| async move {
                info!(%fault, "user creation failed");
                Json(fault.into_http_error())
            }),
        )
        .get("/old-users", |req: Request| async move {
            req.response().redirect("/users/1");
        });

    let config = Config::new().name("basic-demo").port(3000).dev(true);
    Server::from_config(&config)?.serve(App::new(router, config)).await
}

fn find_user(users: &Users, req: &Request) -> Result<Json<User>, HttpError> {
    let id = req
        .param("id")
        .and_then(|id| id.parse::<u64>().ok())
        .ok_or_else(|| HttpError::bad_request("id must be a number"))?;
    users.read().get(&id).cloned().map(Json).ok_or_else(HttpError::not_found)
}

fn create_user(users: &Users, req: &Request) -> Result<Json<User>, HttpError> {
    let mut user: User = req.json()?;
    let mut users = users.write();
    user.id = users.len() as u64 + 1;
    users.insert(user.id, user.clone());
    Ok(Json(user))
}
