// ABOUTME: Date formatter helpers and a pooled wrapper around them.
// ABOUTME: DateFormatPool::format/parse borrow a formatter for the duration of one call.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

use super::resource_pool::ResourcePool;
use crate::config::PoolConfig;
use crate::error::PoolError;

/// A strftime pattern bound to a fixed UTC offset.
///
/// The pattern is checked once at construction, so formatting never fails.
#[derive(Debug, Clone)]
pub struct DateFormat {
    pattern: String,
    offset: FixedOffset,
}

impl DateFormat {
    pub fn new(pattern: impl Into<String>, offset: FixedOffset) -> Result<Self, PoolError> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(PoolError::InvalidPattern(pattern));
        }
        Ok(Self { pattern, offset })
    }

    /// Formatter rendering in UTC.
    pub fn utc(pattern: impl Into<String>) -> Result<Self, PoolError> {
        Self::new(pattern, Utc.fix())
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Render `value` in this formatter's offset.
    pub fn format(&self, value: &DateTime<Utc>) -> String {
        value
            .with_timezone(&self.offset)
            .format(&self.pattern)
            .to_string()
    }

    /// Parse text written in this formatter's pattern and offset.
    ///
    /// The pattern must carry both a date and a time of day.
    pub fn parse(&self, text: &str) -> Result<DateTime<Utc>, PoolError> {
        let naive = NaiveDateTime::parse_from_str(text, &self.pattern).map_err(|source| {
            PoolError::Parse {
                input: text.to_string(),
                source,
            }
        })?;

        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| PoolError::LocalTime(text.to_string()))
    }
}

/// Pooled [`DateFormat`] instances sharing one pattern and offset.
#[derive(Debug)]
pub struct DateFormatPool {
    pool: ResourcePool<DateFormat>,
}

impl DateFormatPool {
    /// Create a pool, rejecting an invalid pattern immediately.
    pub fn new(pattern: impl Into<String>, offset: FixedOffset) -> Result<Self, PoolError> {
        Self::with_config(pattern, offset, &PoolConfig::default())
    }

    pub fn with_config(
        pattern: impl Into<String>,
        offset: FixedOffset,
        config: &PoolConfig,
    ) -> Result<Self, PoolError> {
        // Validated once; every pooled instance is a copy of it.
        let template = DateFormat::new(pattern, offset)?;
        let pool = ResourcePool::with_config(move || Ok(template.clone()), config)?;

        Ok(Self { pool })
    }

    /// Format `value` with a pooled formatter.
    pub fn format(&self, value: &DateTime<Utc>) -> Result<String, PoolError> {
        self.pool.with(|formatter| formatter.format(value))
    }

    /// Parse `text` with a pooled formatter.
    pub fn parse(&self, text: &str) -> Result<DateTime<Utc>, PoolError> {
        self.pool.with(|formatter| formatter.parse(text))?
    }

    /// The underlying pool, for inspection.
    pub fn pool(&self) -> &ResourcePool<DateFormat> {
        &self.pool
    }
}
