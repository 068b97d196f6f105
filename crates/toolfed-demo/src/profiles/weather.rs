//! Weather profile: current conditions from a fixed city table.

use super::Profile;
use crate::protocol::{
    Args, ResourceSpec, ResourceTemplateSpec, ResourceText, ToolError, ToolOutput, ToolSpec,
};
use serde_json::json;

/// Observation time reported for every reading.
const OBSERVED_AT: &str = "2025-06-01T12:00";

struct City {
    name: &'static str,
    /// Local-language alias, matched like the name.
    alias: &'static str,
    country: &'static str,
    latitude: f64,
    longitude: f64,
}

const CITIES: &[City] = &[
    City {
        name: "Seoul",
        alias: "서울",
        country: "South Korea",
        latitude: 37.5665,
        longitude: 126.978,
    },
    City {
        name: "Seocho-gu",
        alias: "서초구",
        country: "South Korea",
        latitude: 37.4837,
        longitude: 127.0324,
    },
    City {
        name: "Busan",
        alias: "부산",
        country: "South Korea",
        latitude: 35.1796,
        longitude: 129.0756,
    },
    City {
        name: "Tokyo",
        alias: "東京",
        country: "Japan",
        latitude: 35.6762,
        longitude: 139.6503,
    },
    City {
        name: "New York",
        alias: "NYC",
        country: "United States",
        latitude: 40.7128,
        longitude: -74.006,
    },
    City {
        name: "London",
        alias: "런던",
        country: "United Kingdom",
        latitude: 51.5072,
        longitude: -0.1276,
    },
];

struct Reading {
    temperature: f64,
    windspeed: f64,
}

/// A deterministic stand-in for a forecast API.
fn reading(latitude: f64, longitude: f64) -> Reading {
    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    Reading {
        temperature: round1(28.0 - latitude.abs() * 0.4 + longitude.abs() % 5.0),
        windspeed: round1(4.0 + (latitude.abs() + longitude.abs()) % 12.0),
    }
}

fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), ToolError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ToolError::InvalidArgument(format!(
            "Latitude {latitude} is out of range (-90..90)"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ToolError::InvalidArgument(format!(
            "Longitude {longitude} is out of range (-180..180)"
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct Weather;

impl Weather {
    pub fn new() -> Self {
        Self
    }

    fn forecast(&self, args: &Args) -> Result<ToolOutput, ToolError> {
        let latitude = args.f64("latitude")?;
        let longitude = args.f64("longitude")?;
        check_coordinates(latitude, longitude)?;

        let r = reading(latitude, longitude);
        Ok(ToolOutput::text(format!(
            "Location: {latitude}, {longitude}\n\
             Temperature: {}°C\n\
             Wind Speed: {} km/h\n\
             Time: {OBSERVED_AT}",
            r.temperature, r.windspeed
        )))
    }

    fn by_location(&self, args: &Args) -> Result<ToolOutput, ToolError> {
        let query = args.str("location_name")?.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArgument(
                "Location name is required.".to_string(),
            ));
        }

        let needle = query.to_lowercase();
        let Some(city) = CITIES.iter().find(|c| {
            c.name.to_lowercase().contains(&needle) || c.alias.to_lowercase() == needle
        }) else {
            tracing::warn!("Location not found: {query}");
            return Ok(ToolOutput::text(format!("Could not find location '{query}'.")));
        };

        let r = reading(city.latitude, city.longitude);
        Ok(ToolOutput::text(format!(
            "Location: {}, {} ({}, {})\n\
             Temperature: {}°C\n\
             Wind Speed: {} km/h\n\
             Time: {OBSERVED_AT}",
            city.name, city.country, city.latitude, city.longitude, r.temperature, r.windspeed
        )))
    }
}

impl Profile for Weather {
    fn server_name(&self) -> &'static str {
        "weather-server"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_weather_forecast",
                description: "Get the current weather for a latitude/longitude.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "latitude": {"type": "number", "description": "Latitude (e.g. 37.5665)"},
                        "longitude": {"type": "number", "description": "Longitude (e.g. 126.9780)"}
                    },
                    "required": ["latitude", "longitude"]
                }),
            },
            ToolSpec {
                name: "get_weather_by_location",
                description: "Get the current weather for a place name (city, district).",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "location_name": {
                            "type": "string",
                            "description": "Place name (e.g. Seoul, 서초구, New York)"
                        }
                    },
                    "required": ["location_name"]
                }),
            },
        ]
    }

    fn call_tool(&mut self, name: &str, args: &Args) -> Result<ToolOutput, ToolError> {
        match name {
            "get_weather_forecast" => self.forecast(args),
            "get_weather_by_location" => self.by_location(args),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resources(&self) -> Vec<ResourceSpec> {
        vec![ResourceSpec {
            uri: "weather://status",
            name: "API Status",
            description: "Current status of the weather data source",
            mime_type: "text/plain",
        }]
    }

    fn resource_templates(&self) -> Vec<ResourceTemplateSpec> {
        vec![ResourceTemplateSpec {
            uri_template: "weather://{latitude}/{longitude}/current",
            name: "Current Weather Location",
            description: "Current weather for any location via resource URI",
            mime_type: "application/json",
        }]
    }

    fn read_resource(&self, uri: &str) -> Option<ResourceText> {
        if uri == "weather://status" {
            return Some(ResourceText {
                mime_type: "text/plain",
                text: "Online (static demo data)".to_string(),
            });
        }

        let path = uri.strip_prefix("weather://")?.strip_suffix("/current")?;
        let (lat, lon) = path.split_once('/')?;
        let latitude: f64 = lat.parse().ok()?;
        let longitude: f64 = lon.parse().ok()?;
        check_coordinates(latitude, longitude).ok()?;

        let r = reading(latitude, longitude);
        let body = json!({
            "temperature": r.temperature,
            "windspeed": r.windspeed,
            "time": OBSERVED_AT,
        });
        Some(ResourceText {
            mime_type: "application/json",
            text: body.to_string(),
        })
    }
}
