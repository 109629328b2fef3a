use serde::Deserialize;

/// Inbound Bot API webhook update. Only the fields the registration flow
/// reads; everything else is ignored, and all of it is optional so odd
/// update shapes never fail deserialization.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub from: Option<Sender>,
    pub chat: Chat,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Message {
    /// Payload of a `/start <payload>` command, if this message is one.
    pub fn start_payload(&self) -> Option<Option<String>> {
        let text = self.text.as_deref()?.trim();
        let rest = text.strip_prefix("/start")?;
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            // some other command, e.g. /startle
            return None;
        }

        let payload = rest.trim();
        if payload.is_empty() {
            Some(None)
        } else {
            Some(Some(payload.to_string()))
        }
    }

    /// Identity used for the user record: the public username when set,
    /// otherwise the numeric account id.
    pub fn sender_identity(&self) -> Option<String> {
        let from = self.from.as_ref()?;
        Some(
            from.username
                .clone()
                .unwrap_or_else(|| from.id.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> Message {
        Message {
            text: Some(text.to_string()),
            from: Some(Sender {
                id: 777,
                username: Some("alice".to_string()),
            }),
            chat: Chat { id: 777 },
        }
    }

    #[test]
    fn start_with_referrer_payload() {
        assert_eq!(
            message("/start bob").start_payload(),
            Some(Some("bob".to_string()))
        );
    }

    #[test]
    fn bare_start_has_no_payload() {
        assert_eq!(message("/start").start_payload(), Some(None));
        assert_eq!(message("/start   ").start_payload(), Some(None));
    }

    #[test]
    fn other_text_is_not_a_start() {
        assert_eq!(message("hello").start_payload(), None);
        assert_eq!(message("/startle bob").start_payload(), None);
    }

    #[test]
    fn identity_falls_back_to_numeric_id() {
        let mut m = message("/start");
        assert_eq!(m.sender_identity(), Some("alice".to_string()));

        m.from = Some(Sender {
            id: 777,
            username: None,
        });
        assert_eq!(m.sender_identity(), Some("777".to_string()));

        m.from = None;
        assert_eq!(m.sender_identity(), None);
    }
}
