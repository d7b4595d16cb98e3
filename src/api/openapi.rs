use super::handlers::{account, health};
use utoipa::openapi::{Contact, Info, InfoBuilder, License, Tag};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        account::create::totp,
        account::create::salt,
        account::create::create,
        account::login::login
    ),
    components(schemas(
        health::Health,
        account::types::RegistrationRequest,
        account::types::LoginRequest
    ))
)]
struct ApiDoc;

/// The served `OpenAPI` document, with the info block taken from Cargo.toml
/// metadata instead of the derive defaults.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();

    let mut account_tag = Tag::new("account");
    account_tag.description = Some("Enrollment intake and three-factor login".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service and database health".to_string());

    doc.tags = Some(vec![account_tag, health_tag]);

    doc
}

fn cargo_info() -> Info {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    info
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
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
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
            assert_eq!(contact.name.as_deref(), Some("Team Permesi"));
            assert_eq!(contact.email.as_deref(), Some("team@permesi.dev"));
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
        assert!(tags.iter().any(|tag| tag.name == "account"));
        assert!(tags.iter().any(|tag| tag.name == "health"));

        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/v1/account/create"));
        assert!(doc.paths.paths.contains_key("/api/v1/account/create/totp"));
        assert!(doc.paths.paths.contains_key("/api/v1/account/create/salt"));
        assert!(doc.paths.paths.contains_key("/api/v1/account/login"));
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Team Permesi <team@permesi.dev>"),
            (Some("Team Permesi"), Some("team@permesi.dev"))
        );
        assert_eq!(parse_author("Team Permesi"), (Some("Team Permesi"), None));
        assert_eq!(parse_author("<team@permesi.dev>"), (None, Some("team@permesi.dev")));
    }
}
