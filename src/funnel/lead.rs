//! Captured leads and the sinks that receive them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::LeadSinkError;

use super::state::CompletedIntake;

/// A prospective customer's contact details plus the package they chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub session_id: String,
    pub package: String,
    /// `None` for orders without a price.
    pub total: Option<Decimal>,
    pub email: String,
    pub phone: String,
    pub note: String,
    pub captured_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(session_id: impl Into<String>, intake: CompletedIntake) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            package: intake.package,
            total: intake.total,
            email: intake.email,
            phone: intake.phone,
            note: intake.note,
            captured_at: Utc::now(),
        }
    }
}

/// Write-only destination for captured leads.
///
/// Callers log failures and move on; a sink is never retried.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn record(&self, lead: &Lead) -> Result<(), LeadSinkError>;
}

/// Emits each lead as a structured `info!` event.
#[derive(Debug, Default)]
pub struct TracingLeadSink;

#[async_trait]
impl LeadSink for TracingLeadSink {
    async fn record(&self, lead: &Lead) -> Result<(), LeadSinkError> {
        let total = lead
            .total
            .map(|t| t.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        tracing::info!(
            lead_id = %lead.id,
            session_id = %lead.session_id,
            package = %lead.package,
            total = %total,
            email = %lead.email,
            phone = %lead.phone,
            note = %lead.note,
            "LEAD"
        );
        Ok(())
    }
}

/// Appends each lead as one JSON object per line.
pub struct JsonlLeadSink {
    path: PathBuf,
    // Serializes appends so concurrent leads never interleave within a line.
    write_lock: Mutex<()>,
}

impl JsonlLeadSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LeadSink for JsonlLeadSink {
    async fn record(&self, lead: &Lead) -> Result<(), LeadSinkError> {
        let mut line = serde_json::to_string(lead)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Forwards each lead to every inner sink. One failing sink does not stop the others.
#[derive(Default)]
pub struct FanoutLeadSink {
    sinks: Vec<Arc<dyn LeadSink>>,
}

impl FanoutLeadSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LeadSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl LeadSink for FanoutLeadSink {
    async fn record(&self, lead: &Lead) -> Result<(), LeadSinkError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(lead).await {
                tracing::warn!(lead_id = %lead.id, "Lead sink failed: {}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
