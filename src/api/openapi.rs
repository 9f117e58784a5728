use super::handlers::{
    auth, contact, events, health, leaderboard, me, registration, roster, users,
};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
/// Routes added outside (like `/` or `OPTIONS /health`) are not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::signup::signup))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::verification::verify_email))
        .routes(routes!(auth::verification::resend_verification))
        .routes(routes!(me::get_me, me::patch_me))
        .routes(routes!(me::my_events))
        .routes(routes!(
            events::crud::list_events,
            events::crud::create_event
        ))
        .routes(routes!(
            events::crud::get_event,
            events::crud::update_event,
            events::crud::delete_event
        ))
        .routes(routes!(events::crud::regenerate_code))
        .routes(routes!(events::photo::upload_photo))
        .routes(routes!(
            registration::get_registration,
            registration::cancel
        ))
        .routes(routes!(registration::rsvp))
        .routes(routes!(registration::sign_in))
        .routes(routes!(roster::roster_csv))
        .routes(routes!(leaderboard::leaderboard))
        .routes(routes!(users::list_users))
        .routes(routes!(users::set_admin))
        .routes(routes!(contact::contact));

    let tags = [
        ("rollcall", "Membership, events and attendance points"),
        ("health", "Service and database health"),
        ("auth", "Signup, login, sessions and email verification"),
        ("me", "The signed-in member's profile and events"),
        ("events", "Event schedule and admin management"),
        ("registration", "RSVP, sign-in and cancellation"),
        ("leaderboard", "Point standings"),
        ("users", "Admin member management"),
        ("contact", "Public contact form"),
    ]
    .into_iter()
    .map(|(name, description)| {
        let mut tag = Tag::new(name);
        tag.description = Some(description.to_string());
        tag
    })
    .collect();

    router.get_openapi_mut().tags = Some(tags);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn blank_to_none(value: &str) -> Option<&str> {
        (!value.is_empty()).then_some(value)
    }
    match author.find('<') {
        Some(start) => {
            let name = author[..start].trim();
            let email = author[start + 1..].trim_end_matches('>').trim();
            (blank_to_none(name), blank_to_none(email))
        }
        None => (blank_to_none(author.trim()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            doc.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Rollcall"));
            assert_eq!(contact.email.as_deref(), Some("team@rollcall.dev"));
        }

        let license = doc.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let doc = openapi();
        let tags = doc.tags.clone().unwrap_or_default();
        for name in ["rollcall", "auth", "events", "registration", "leaderboard"] {
            assert!(tags.iter().any(|tag| tag.name == name), "missing tag {name}");
        }
        for path in [
            "/health",
            "/v1/auth/signup",
            "/v1/events/{id}",
            "/v1/events/{id}/sign-in",
            "/v1/events/{id}/roster.csv",
            "/v1/leaderboard",
            "/v1/users/{id}/admin",
            "/v1/contact",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn shared_paths_keep_every_method() {
        let doc = openapi();
        let item = doc.paths.paths.get("/v1/events/{id}");
        assert!(item.is_some());
        if let Some(item) = item {
            assert!(item.get.is_some());
            assert!(item.patch.is_some());
            assert!(item.delete.is_some());
        }
    }

    #[test]
    fn author_parsing() {
        assert_eq!(
            parse_author("Ada <ada@example.com>"),
            (Some("Ada"), Some("ada@example.com"))
        );
        assert_eq!(parse_author("Ada"), (Some("Ada"), None));
        assert_eq!(parse_author("<a@b.c>"), (None, Some("a@b.c")));
    }
}
