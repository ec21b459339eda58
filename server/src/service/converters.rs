//! Conversion functions from domain records to JSON response bodies

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::persistence::{Connection, ConnectionStatus, Link, Profile};
use crate::storage::is_remote;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub icon_url: Option<String>,
    pub aka: Option<String>,
    pub hometown: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub hobby: Option<String>,
    pub comment: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: i64,
    pub profile_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub id: i64,
    pub requester_profile_id: i64,
    pub target_profile_id: i64,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Hosted images are linked directly; local ones through `local_route`.
fn image_url(reference: Option<&str>, local_route: impl FnOnce() -> String) -> Option<String> {
    reference.map(|r| if is_remote(r) { r.to_string() } else { local_route() })
}

pub fn convert_profile(profile: Profile, public_url: &str) -> ProfileResponse {
    let id = profile.id;
    ProfileResponse {
        icon_url: image_url(profile.icon_ref.as_deref(), || {
            format!("{public_url}/api/profiles/{id}/icon")
        }),
        id,
        user_id: profile.user_id,
        display_name: profile.display_name,
        aka: profile.aka,
        hometown: profile.hometown,
        birthdate: profile.birthdate,
        hobby: profile.hobby,
        comment: profile.comment,
        title: profile.title,
        description: profile.description,
        created_at: profile.created_at,
        updated_at: profile.updated_at,
    }
}

pub fn convert_link(link: Link, public_url: &str) -> LinkResponse {
    let id = link.id;
    LinkResponse {
        image_url: image_url(link.image_ref.as_deref(), || {
            format!("{public_url}/api/links/{id}/image")
        }),
        id,
        profile_id: link.profile_id,
        title: link.title,
        url: link.url,
        description: link.description,
        created_at: link.created_at,
        updated_at: link.updated_at,
    }
}

pub fn convert_connection(connection: Connection) -> ConnectionResponse {
    ConnectionResponse {
        id: connection.id,
        requester_profile_id: connection.requester_profile_id,
        target_profile_id: connection.target_profile_id,
        status: connection.status,
        created_at: connection.created_at,
        updated_at: connection.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(icon_ref: Option<&str>) -> Profile {
        let now = Utc::now();
        Profile {
            id: 12,
            user_id: 3,
            display_name: "Hana".to_string(),
            icon_ref: icon_ref.map(str::to_string),
            aka: None,
            hometown: None,
            birthdate: NaiveDate::from_ymd_opt(2001, 5, 6),
            hobby: None,
            comment: None,
            title: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_local_icon_gets_api_url() {
        let response = convert_profile(profile(Some("a.png")), "https://api.example");
        assert_eq!(
            response.icon_url.as_deref(),
            Some("https://api.example/api/profiles/12/icon")
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["birthdate"], "2001-05-06");
        assert!(json.get("icon_ref").is_none());
    }

    #[test]
    fn test_hosted_icon_is_passed_through() {
        let url = "https://res.cloudinary.com/demo/image/upload/qrsona/profiles/x.png";
        let response = convert_profile(profile(Some(url)), "https://api.example");
        assert_eq!(response.icon_url.as_deref(), Some(url));
    }

    #[test]
    fn test_no_icon_is_null() {
        let response = convert_profile(profile(None), "https://api.example");
        assert_eq!(response.icon_url, None);
    }
}
