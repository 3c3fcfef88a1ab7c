use rumqttc::MqttOptions;
use std::time::Duration;

/// Resolved broker settings for one device.
///
/// The last will is deliberately not part of the options built here; it is
/// registered by the session setup state machine before the session opens.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    pub status_topic: String,
    pub retry_cadence: Duration,
}

impl SessionConfig {
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(&self.client_id, &self.host, self.port);
        mqtt_options
            .set_keep_alive(self.keep_alive)
            .set_clean_session(true);

        if let Some(user) = &self.username {
            mqtt_options.set_credentials(user, self.password.clone().unwrap_or_default());
        }
        mqtt_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            client_id: "tally-studio-a".to_string(),
            host: "broker.local".to_string(),
            port: 1883,
            username: Some("studio".to_string()),
            password: Some("secret".to_string()),
            keep_alive: Duration::from_secs(5),
            status_topic: "studio-a/status".to_string(),
            retry_cadence: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_options_carry_broker_settings_without_will() {
        let options = config().mqtt_options();

        assert_eq!(options.client_id(), "tally-studio-a");
        assert_eq!(
            options.broker_address(),
            ("broker.local".to_string(), 1883)
        );
        assert_eq!(options.keep_alive(), Duration::from_secs(5));
        assert_eq!(
            options.credentials(),
            Some(("studio".to_string(), "secret".to_string()))
        );
        assert!(options.last_will().is_none());
    }

    #[test]
    fn test_anonymous_session_has_no_credentials() {
        let mut config = config();
        config.username = None;
        assert!(config.mqtt_options().credentials().is_none());
    }
}
