use std::collections::BTreeMap;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Locale sent when the caller does not choose one.
pub const DEFAULT_LOCALE: &str = "en-US";

pub(crate) const LOCALE_KEY: &str = "image_request[locale]";
pub(crate) const REMOTE_IMAGE_URL_KEY: &str = "image_request[remote_image_url]";

/// Geolocation context attached to a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct Position {
    #[garde(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[garde(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[garde(skip)]
    pub altitude: f64,
}

/// Relative focal point, North-West gravity: (0.0, 0.0) is the upper-left
/// corner and (1.0, 1.0) the lower-right one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct RelativeFocus {
    #[garde(range(min = 0.0, max = 1.0))]
    pub x: f64,

    #[garde(range(min = 0.0, max = 1.0))]
    pub y: f64,
}

/// Additional request parameters, keyed by their wire names.
///
/// Keys are kept sorted, which is also the order the OAuth signature base
/// string expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set a raw parameter. Prefer the typed setters below.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` encoding, keys in sorted order.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Locale of the request. Defaults to [`DEFAULT_LOCALE`].
    pub fn set_locale(&mut self, locale: &str) -> &mut Self {
        self.insert(LOCALE_KEY, locale)
    }

    /// Language the annotation is returned in. The service default is `en`.
    pub fn set_language(&mut self, language: &str) -> &mut Self {
        self.insert("image_request[language]", language)
    }

    /// Unique id of the device sending the request, ideally a UUID.
    pub fn set_device_id(&mut self, device_id: &str) -> &mut Self {
        self.insert("image_request[device_id]", device_id)
    }

    pub fn set_latitude(&mut self, latitude: f64) -> Result<&mut Self, ParamError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ParamError::Latitude(latitude));
        }
        Ok(self.insert("image_request[latitude]", latitude.to_string()))
    }

    pub fn set_longitude(&mut self, longitude: f64) -> Result<&mut Self, ParamError> {
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ParamError::Longitude(longitude));
        }
        Ok(self.insert("image_request[longitude]", longitude.to_string()))
    }

    pub fn set_altitude(&mut self, altitude: f64) -> &mut Self {
        self.insert("image_request[altitude]", altitude.to_string())
    }

    /// Set latitude, longitude and altitude together. Nothing is written if
    /// any coordinate is out of range.
    pub fn set_position(&mut self, position: Position) -> Result<&mut Self, ParamError> {
        position.validate().map_err(ParamError::Invalid)?;
        self.set_latitude(position.latitude)?;
        self.set_longitude(position.longitude)?;
        Ok(self.set_altitude(position.altitude))
    }

    /// Deadline in seconds before the job expires. Use [`Params::set_max_ttl`]
    /// for the longest deadline the service allows.
    pub fn set_ttl(&mut self, ttl: i64) -> Result<&mut Self, ParamError> {
        if ttl <= 0 {
            return Err(ParamError::Ttl(ttl));
        }
        Ok(self.insert("image_request[ttl]", ttl.to_string()))
    }

    pub fn set_max_ttl(&mut self) -> &mut Self {
        self.insert("image_request[ttl]", "max")
    }

    /// Relative focal point (0.0 through 1.0 on each axis). When the image has
    /// many identifiable objects, the ones closest to the point win.
    pub fn set_focus_relative(&mut self, focus: RelativeFocus) -> Result<&mut Self, ParamError> {
        focus.validate().map_err(ParamError::Invalid)?;
        self.insert("focus[x]", focus.x.to_string());
        Ok(self.insert("focus[y]", focus.y.to_string()))
    }

    /// Absolute focal point in pixels, e.g. 0 through 400 on a 400x400 image.
    pub fn set_focus_absolute(&mut self, x: i64, y: i64) -> Result<&mut Self, ParamError> {
        if x < 0 {
            return Err(ParamError::FocusAbsolute { axis: 'x', value: x });
        }
        if y < 0 {
            return Err(ParamError::FocusAbsolute { axis: 'y', value: y });
        }
        self.insert("focus[x]", x.to_string());
        Ok(self.insert("focus[y]", y.to_string()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error("Invalid latitude: {0}, should be within [-90, 90]")]
    Latitude(f64),

    #[error("Invalid longitude: {0}, should be within [-180, 180]")]
    Longitude(f64),

    #[error("Invalid ttl: {0}, should be greater than 0")]
    Ttl(i64),

    #[error("Invalid focus {axis} parameter: {value}, should be greater or equal to 0")]
    FocusAbsolute { axis: char, value: i64 },

    #[error("Invalid parameters: {0}")]
    Invalid(garde::Report),
}
