use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::config::Config;

pub const BINANCE_API_BASE: &str = "https://api.binance.com";
const KLINES_PATH: &str = "/api/v3/klines";
const CACHE_HEADER: [&str; 2] = ["open_time", "close"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time_ms: i64,
    pub close: f64,
}

/// One line of the on-disk price cache.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    open_time: String,
    close: f64,
}

impl CacheRow {
    fn into_candle(self) -> Option<Candle> {
        if !self.close.is_finite() || self.close <= 0.0 {
            return None;
        }
        let open_time = OffsetDateTime::parse(&self.open_time, &Rfc3339).ok()?;
        let open_time_ms = i64::try_from(open_time.unix_timestamp_nanos() / 1_000_000).ok()?;
        Some(Candle {
            open_time_ms,
            close: self.close,
        })
    }
}

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    InvalidPayload,
    InvalidClose { index: usize },
    InvalidTimestamp { index: usize },
    EmptySeries,
    Cache(io::Error),
    CacheFormat(csv::Error),
    InvalidCacheLine { line: usize },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "kline request failed: {err}"),
            Self::InvalidPayload => write!(f, "kline payload is not an array of klines"),
            Self::InvalidClose { index } => {
                write!(f, "kline {index} has a missing or non-positive close")
            }
            Self::InvalidTimestamp { index } => {
                write!(f, "kline {index} has an out-of-range open time")
            }
            Self::EmptySeries => write!(f, "price series is empty"),
            Self::Cache(err) => write!(f, "price cache io failed: {err}"),
            Self::CacheFormat(err) => write!(f, "price cache csv failed: {err}"),
            Self::InvalidCacheLine { line } => write!(f, "price cache line {line} is malformed"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Cache(err) => Some(err),
            Self::CacheFormat(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<csv::Error> for FetchError {
    fn from(err: csv::Error) -> Self {
        Self::CacheFormat(err)
    }
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        Self::Cache(err)
    }
}

/// Close prices for one symbol/interval, fetched from the exchange and
/// mirrored to a CSV cache that is used when the fetch fails.
#[derive(Debug, Clone)]
pub struct HistoricalPriceSource {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
    interval: String,
    limit: u32,
    cache_dir: PathBuf,
}

impl HistoricalPriceSource {
    pub fn new(
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        limit: u32,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            symbol: symbol.into(),
            interval: interval.into(),
            limit,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            BINANCE_API_BASE,
            config.symbol.as_str(),
            config.interval.as_str(),
            config.candle_limit,
            config.cache_dir.as_str(),
        )
    }

    pub fn cache_path(&self) -> PathBuf {
        let file_name = format!("{}_{}.csv", self.symbol.replace('/', "_"), self.interval);
        self.cache_dir.join(file_name)
    }

    pub async fn fetch_candles(&self) -> Result<Vec<Candle>, FetchError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), KLINES_PATH);
        let limit = self.limit.to_string();
        let body = self
            .client
            .get(url)
            .query(&[
                ("symbol", self.symbol.as_str()),
                ("interval", self.interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_klines(&body)
    }

    /// Fresh candles when the exchange answers (refreshing the cache), the
    /// cached series otherwise. Fails only when both are unavailable.
    pub async fn load_candles(&self) -> Result<Vec<Candle>, FetchError> {
        let cache_path = self.cache_path();
        match self.fetch_candles().await {
            Ok(candles) => {
                tracing::info!(
                    symbol = %self.symbol,
                    interval = %self.interval,
                    candles = candles.len(),
                    "fetched klines"
                );
                if let Err(err) = write_cache(&cache_path, &candles) {
                    tracing::warn!(
                        path = %cache_path.display(),
                        error = %err,
                        "could not write price cache"
                    );
                }
                Ok(candles)
            }
            Err(fetch_err) => {
                if !cache_path.exists() {
                    return Err(fetch_err);
                }
                tracing::warn!(
                    error = %fetch_err,
                    path = %cache_path.display(),
                    "kline fetch failed, loading cached prices"
                );
                read_cache(&cache_path)
            }
        }
    }

    pub async fn load_close_prices(&self) -> Result<Vec<f64>, FetchError> {
        let candles = self.load_candles().await?;
        Ok(candles.into_iter().map(|candle| candle.close).collect())
    }
}

/// Binance kline rows are arrays: `[open_time, open, high, low, close, ...]`
/// with prices as decimal strings.
pub fn parse_klines(payload: &str) -> Result<Vec<Candle>, FetchError> {
    let value: Value = serde_json::from_str(payload).map_err(|_| FetchError::InvalidPayload)?;
    let rows = value.as_array().ok_or(FetchError::InvalidPayload)?;
    if rows.is_empty() {
        return Err(FetchError::EmptySeries);
    }

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let fields = row.as_array().ok_or(FetchError::InvalidPayload)?;
            let open_time_ms = fields
                .first()
                .and_then(Value::as_i64)
                .ok_or(FetchError::InvalidPayload)?;
            let close = fields
                .get(4)
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse::<f64>().ok())
                .filter(|close| close.is_finite() && *close > 0.0)
                .ok_or(FetchError::InvalidClose { index })?;
            Ok(Candle {
                open_time_ms,
                close,
            })
        })
        .collect()
}

pub fn write_cache(path: &Path, candles: &[Candle]) -> Result<(), FetchError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(CACHE_HEADER)?;
    for (index, candle) in candles.iter().enumerate() {
        let open_time = format_open_time(candle.open_time_ms)
            .ok_or(FetchError::InvalidTimestamp { index })?;
        writer.serialize(CacheRow {
            open_time,
            close: candle.close,
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_cache(path: &Path) -> Result<Vec<Candle>, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record)? || record.iter().ne(CACHE_HEADER) {
        return Err(FetchError::InvalidCacheLine { line: 1 });
    }
    let headers = record.clone();

    let mut candles = Vec::new();
    while reader.read_record(&mut record)? {
        let line = record
            .position()
            .map_or(candles.len() + 2, |position| position.line() as usize);
        let candle = record
            .deserialize::<CacheRow>(Some(&headers))
            .ok()
            .and_then(CacheRow::into_candle)
            .ok_or(FetchError::InvalidCacheLine { line })?;
        candles.push(candle);
    }
    if candles.is_empty() {
        return Err(FetchError::EmptySeries);
    }
    Ok(candles)
}

fn format_open_time(open_time_ms: i64) -> Option<String> {
    let nanos = i128::from(open_time_ms) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()?
        .format(&Rfc3339)
        .ok()
}
