use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::traits::LightApiSink;
use super::SinkError;
use crate::config::HomeAssistantConfig;
use crate::cue::cue::Rgbw;

/// Body of a Home Assistant `light.turn_on` service call.
#[derive(Debug, Serialize)]
struct LightRequest<'a> {
    entity_id: String,
    rgbw_color: [u8; 4],
    transition: f64,
    effect: &'a str,
}

/// House lights driven through the Home Assistant REST API.
pub struct HomeAssistantLights {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    entity_prefix: String,
}

impl HomeAssistantLights {
    pub fn new(config: &HomeAssistantConfig, timeout: Duration) -> Result<Self, SinkError> {
        let token = std::env::var(&config.token_env).ok();
        if token.is_none() {
            log::warn!(
                "{} is not set, light API requests will be sent without a token",
                config.token_env
            );
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/api/services/light/turn_on",
                config.url.trim_end_matches('/')
            ),
            token,
            entity_prefix: config.entity_prefix.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn entity_id(&self, light_id: u8) -> String {
        format!("{}{}", self.entity_prefix, light_id)
    }
}

#[async_trait]
impl LightApiSink for HomeAssistantLights {
    async fn set_color(
        &self,
        light_id: u8,
        rgbw: Rgbw,
        transition_seconds: f64,
        effect: &str,
    ) -> Result<(), SinkError> {
        let body = LightRequest {
            entity_id: self.entity_id(light_id),
            rgbw_color: rgbw.channels(),
            transition: transition_seconds,
            effect,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SinkError::HttpStatus(response.status()));
        }

        log::debug!(
            "light {} -> {:?} over {}s ({})",
            light_id,
            rgbw.channels(),
            transition_seconds,
            effect
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HomeAssistantConfig {
        HomeAssistantConfig {
            url: "http://homeassistant.local:8123/".to_string(),
            token_env: "CUEBRIDGE_TEST_UNSET_TOKEN".to_string(),
            entity_prefix: "light.house_light_".to_string(),
        }
    }

    #[test]
    fn test_endpoint_and_entity() {
        let lights = HomeAssistantLights::new(&config(), Duration::from_secs(2)).unwrap();
        assert_eq!(
            lights.endpoint(),
            "http://homeassistant.local:8123/api/services/light/turn_on"
        );
        assert_eq!(lights.entity_id(3), "light.house_light_3");
    }

    #[test]
    fn test_request_body() {
        let body = LightRequest {
            entity_id: "light.house_light_1".to_string(),
            rgbw_color: [255, 0, 0, 0],
            transition: 1.5,
            effect: "None",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "entity_id": "light.house_light_1",
                "rgbw_color": [255, 0, 0, 0],
                "transition": 1.5,
                "effect": "None"
            })
        );
    }
}
