use chrono::{DateTime, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{Credentials, Error, HttpSession, PRODUCTION_BASE_URL};

/// Network code the reporting endpoint expects for every Vaasan Sähkö
/// metering point, regardless of customer.
const NETWORK_CODE: &str = "VS0000";

/// One hourly sample: epoch milliseconds and consumed energy.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionPoint {
    pub timestamp_millis: i64,
    pub value: f64,
}

impl ConsumptionPoint {
    /// The sample's hour as a UTC instant.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_millis)
    }
}

/// Hourly consumption series in server order, freshly built per fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionSeries {
    pub points: Vec<ConsumptionPoint>,
}

impl ConsumptionSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn as_polars_df(&self) -> Result<DataFrame, Error> {
        let mut times: Vec<NaiveDateTime> = Vec::with_capacity(self.points.len());
        let mut values: Vec<f64> = Vec::with_capacity(self.points.len());

        for point in &self.points {
            let time = point.time().ok_or_else(|| {
                Error::UnexpectedResponseShape(format!(
                    "timestamp {} is out of range",
                    point.timestamp_millis
                ))
            })?;
            times.push(time.naive_utc());
            values.push(point.value);
        }

        let df = DataFrame::new(vec![
            Series::new("time".into(), times),
            Series::new("consumption".into(), values),
        ])?;

        Ok(df)
    }
}

#[derive(Deserialize, Debug)]
struct HourlyConsumptionResponse {
    #[serde(rename = "Consumptions")]
    consumptions: Vec<RawConsumption>,
}

#[derive(Deserialize, Debug)]
struct RawConsumption {
    #[serde(rename = "Series")]
    series: RawSeries,
}

#[derive(Deserialize, Debug)]
struct RawSeries {
    #[serde(rename = "Data")]
    data: Vec<(i64, f64)>,
}

/// Fetches the hourly consumption series for the configured metering point.
///
/// Requires the shared [`HttpSession`] to be authenticated already (see
/// [`AuthSession::login`](crate::api::auth::AuthSession::login)); this is not
/// checked locally, an unauthenticated call fails on the portal side.
pub struct ConsumptionReader<'a> {
    session: &'a dyn HttpSession,
    credentials: &'a Credentials,
    base_url: String,
}

impl<'a> ConsumptionReader<'a> {
    const HOURLY_PATH: &'static str = "/Reporting/CustomerConsumption/GetHourlyConsumption";

    pub fn new(session: &'a dyn HttpSession, credentials: &'a Credentials) -> Self {
        ConsumptionReader {
            session,
            credentials,
            base_url: PRODUCTION_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Returns the hourly series, in server order, with timestamps
    /// normalized to plain UTC epoch milliseconds.
    #[instrument(skip_all)]
    pub async fn hourly(&self) -> Result<ConsumptionSeries, Error> {
        let url = format!("{}{}", self.base_url, Self::HOURLY_PATH);
        let form = [
            ("customerCode", self.credentials.customer_code.as_str()),
            ("networkCode", NETWORK_CODE),
            (
                "meteringPointCode",
                self.credentials.metering_point_code.as_str(),
            ),
            ("enableTemperature", "false"),
            ("enablePriceSeries", "false"),
            ("enableTemperatureCorrectedConsumption", "false"),
            (
                "mpSourceCompanyCode",
                self.credentials.source_company_code.as_str(),
            ),
            ("activeTarificationId", ""),
        ];

        let body = self.session.post_form(&url, &form).await?;
        let response: HourlyConsumptionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::UnexpectedResponseShape(e.to_string()))?;

        let consumption = response.consumptions.into_iter().next().ok_or_else(|| {
            Error::UnexpectedResponseShape("Consumptions array is empty".to_string())
        })?;

        let points = consumption
            .series
            .data
            .into_iter()
            .map(|(raw_millis, value)| {
                Ok(ConsumptionPoint {
                    timestamp_millis: normalize_timestamp(raw_millis)?,
                    value,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        debug!(points = points.len(), "fetched hourly consumption");
        Ok(ConsumptionSeries { points })
    }
}

/// Re-encodes a raw portal timestamp as plain UTC epoch milliseconds.
///
/// The value is broken down on the UTC calendar and encoded back, so the
/// host timezone never leaks into the epoch math. For values that are
/// already UTC-aligned the round trip is lossless.
fn normalize_timestamp(raw_millis: i64) -> Result<i64, Error> {
    let instant = DateTime::<Utc>::from_timestamp(raw_millis / 1000, 0).ok_or_else(|| {
        Error::UnexpectedResponseShape(format!("timestamp {raw_millis} is out of range"))
    })?;
    Ok(instant.timestamp() * 1000)
}
