use serde::Serialize;

const ENABLE_LOGS: bool = true;

use crate::{log_info, session::Session};

use super::{client::ApiClient, ApiError};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Sign-up form as the UI collects it.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub user_type: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct RegisterBody<'a> {
    email: &'a str,
    full_name: &'a str,
    password: &'a str,
    role: &'static str,
}

/// UI user types to backend roles. Unknown types register as citizens.
pub fn map_user_type_to_role(user_type: &str) -> &'static str {
    match user_type {
        "citizen" => "citizen",
        "authority" => "official",
        "analyst" => "analyst",
        _ => "citizen",
    }
}

impl ApiClient {
    /// Password login. On success the session store is signed in with the returned token.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let form = [
            ("username", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let response = self.send(self.post("/auth/login").form(&form)).await?;
        let session: Session = Self::read_json(response).await?;

        self.session().sign_in(session.clone());
        log_info!("Logged in as {}", credentials.email);
        Ok(session)
    }

    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<serde_json::Value, ApiError> {
        let body = RegisterBody {
            email: &registration.email,
            full_name: &registration.full_name,
            password: &registration.password,
            role: map_user_type_to_role(&registration.user_type),
        };
        let response = self.send(self.post("/auth/register").json(&body)).await?;
        Self::read_json(response).await
    }

    pub fn logout(&self) {
        self.session().sign_out();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles() {
        assert_eq!(map_user_type_to_role("citizen"), "citizen");
        assert_eq!(map_user_type_to_role("authority"), "official");
        assert_eq!(map_user_type_to_role("analyst"), "analyst");
        assert_eq!(map_user_type_to_role("admin"), "citizen");
        assert_eq!(map_user_type_to_role(""), "citizen");
    }

    #[test]
    fn register_body_shape() {
        let body = RegisterBody {
            email: "a@b.c",
            full_name: "Asha",
            password: "pw",
            role: map_user_type_to_role("authority"),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "email": "a@b.c",
                "full_name": "Asha",
                "password": "pw",
                "role": "official"
            })
        );
    }
}
