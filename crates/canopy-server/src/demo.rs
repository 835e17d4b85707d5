// Code-backed demo pages: a user list that loads its data asynchronously and
// a user detail page that signals not-found for unknown ids.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use canopy::render::{Component, Html, Props, SharedComponent};
use maud::html;
use canopy::{FileKind, RenderError, RouteError, RouteTreeBuilder};

struct User {
    id: u32,
    name: &'static str,
    email: &'static str,
}

const USERS: &[User] = &[
    User {
        id: 1,
        name: "Ada Lovelace",
        email: "ada@example.com",
    },
    User {
        id: 2,
        name: "Grace Hopper",
        email: "grace@example.com",
    },
    User {
        id: 3,
        name: "Barbara Liskov",
        email: "barbara@example.com",
    },
];

/// Stand-in for a database call
async fn fetch_users(latency: Duration) -> &'static [User] {
    tokio::time::sleep(latency).await;
    USERS
}

async fn fetch_user(id: u32, latency: Duration) -> Option<&'static User> {
    fetch_users(latency).await.iter().find(|user| user.id == id)
}

pub struct UserList {
    latency: Duration,
}

#[async_trait]
impl Component for UserList {
    async fn render(&self, _props: Props<'_>) -> Result<Html, RenderError> {
        let users = fetch_users(self.latency).await;
        Ok(html! {
            h1 { "Users" }
            ul {
                @for user in users {
                    li { a href={ "/users/" (user.id) } { (user.name) } }
                }
            }
        }
        .into())
    }
}

pub struct UserDetail {
    latency: Duration,
}

#[async_trait]
impl Component for UserDetail {
    async fn render(&self, props: Props<'_>) -> Result<Html, RenderError> {
        let raw = props.params.one("id").unwrap_or_default();
        let id: u32 = raw
            .parse()
            .map_err(|_| RenderError::failure(format!("invalid user id `{raw}`")))?;

        let user = fetch_user(id, self.latency)
            .await
            .ok_or_else(RenderError::not_found)?;

        Ok(html! {
            h1 { (user.name) }
            p { (user.email) }
            a href="/users" { "All users" }
        }
        .into())
    }
}

/// Adds the code-backed pages under `/users`
pub fn register(
    builder: &mut RouteTreeBuilder<SharedComponent>,
    latency: Duration,
) -> Result<(), RouteError> {
    builder
        .add("users", FileKind::Page, Arc::new(UserList { latency }))?
        .add("users/[id]", FileKind::Page, Arc::new(UserDetail { latency }))?;
    Ok(())
}
