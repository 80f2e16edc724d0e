use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::param;
use crate::tool::{ParameterDefinition, Tool, ToolParameters, ToolResult};

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const IP_LOOKUP_URL: &str = "http://ip-api.com/json/";

/// Current-conditions weather tool backed by Open-Meteo (no key required)
pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| OPEN_METEO_URL.to_string()),
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        crate::WEATHER_TOOL
    }

    fn description(&self) -> &str {
        "Get current weather conditions for a location. Uses the caller's coordinates when latitude and longitude are omitted."
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        HashMap::from([
            param!("latitude", "number", "Latitude in decimal degrees", optional),
            param!("longitude", "number", "Longitude in decimal degrees", optional),
        ])
    }

    async fn execute(&self, params: ToolParameters, context: &ToolContext) -> ToolResult {
        let latitude = params
            .get_optional::<f64>("latitude")
            .unwrap_or(None)
            .or(context.geolocation.map(|g| g.latitude));
        let longitude = params
            .get_optional::<f64>("longitude")
            .unwrap_or(None)
            .or(context.geolocation.map(|g| g.longitude));

        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return ToolResult::error(
                "No location available: pass latitude/longitude or enable geolocation".to_string(),
            );
        };

        let response = match self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ToolResult::error(format!("Weather request failed: {}", e)),
        };

        if !response.status().is_success() {
            return ToolResult::error(format!(
                "Weather service returned status {}",
                response.status()
            ));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return ToolResult::error(format!("Weather response was not JSON: {}", e)),
        };

        let current = &body["current_weather"];
        let temperature = current["temperature"].as_f64();
        let windspeed = current["windspeed"].as_f64();

        match (temperature, windspeed) {
            (Some(temperature), Some(windspeed)) => ToolResult::success(format!(
                "Current weather at ({:.3}, {:.3}): {:.1}°C, wind {:.1} km/h",
                latitude, longitude, temperature, windspeed
            )),
            _ => ToolResult::error("Weather response missing current conditions".to_string()),
        }
    }
}

/// Resolves the caller's location: request geolocation when present,
/// IP-based lookup otherwise
pub struct LocationDetectorTool {
    client: reqwest::Client,
    lookup_url: String,
}

impl LocationDetectorTool {
    pub fn new(lookup_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            lookup_url: lookup_url.unwrap_or_else(|| IP_LOOKUP_URL.to_string()),
        }
    }
}

#[async_trait]
impl Tool for LocationDetectorTool {
    fn name(&self) -> &str {
        crate::LOCATION_TOOL
    }

    fn description(&self) -> &str {
        "Detect the user's approximate location. Prefers coordinates supplied with the request, falling back to IP-based lookup."
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        HashMap::new()
    }

    async fn execute(&self, _params: ToolParameters, context: &ToolContext) -> ToolResult {
        if let Some(geo) = context.geolocation {
            return ToolResult::success(format!(
                "User location: latitude {:.4}, longitude {:.4}",
                geo.latitude, geo.longitude
            ));
        }

        let response = match self.client.get(&self.lookup_url).send().await {
            Ok(response) => response,
            Err(e) => return ToolResult::error(format!("Location lookup failed: {}", e)),
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return ToolResult::error(format!("Location response was not JSON: {}", e)),
        };

        if body["status"].as_str() != Some("success") {
            return ToolResult::error("Location lookup was unsuccessful".to_string());
        }

        let city = body["city"].as_str().unwrap_or("unknown city");
        let country = body["country"].as_str().unwrap_or("unknown country");
        let lat = body["lat"].as_f64().unwrap_or(0.0);
        let lon = body["lon"].as_f64().unwrap_or(0.0);

        ToolResult::success(format!(
            "User location: {}, {} (latitude {:.4}, longitude {:.4})",
            city, country, lat, lon
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qurse_models::Geolocation;

    #[tokio::test]
    async fn location_detector_prefers_request_geolocation() {
        let tool = LocationDetectorTool::new(None);
        let context = ToolContext::default().with_geolocation(Some(Geolocation {
            latitude: 52.52,
            longitude: 13.405,
        }));

        let result = tool.execute(ToolParameters::default(), &context).await;
        assert!(result.success);
        assert!(result.content.contains("52.52"));
        assert!(result.content.contains("13.405"));
    }

    #[tokio::test]
    async fn weather_without_any_location_is_an_error() {
        let tool = WeatherTool::new(None);
        let result = tool
            .execute(ToolParameters::default(), &ToolContext::default())
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("No location available"));
    }
}
