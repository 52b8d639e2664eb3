#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sql_keywords::config::{ConnectionUrl, EngineOptions};
use sql_keywords::engine::{ConnectionFactory, Engine, RawConnection};
use sql_keywords::results::ResultSet;
use sql_keywords::types::RowValues;
use sql_keywords::SqlKeywordError;

/// Everything the fake backend saw, shared by the factory and every engine it builds.
#[derive(Debug, Default)]
pub struct Journal {
    pub urls: Vec<String>,
    pub statements: Vec<(String, String)>,
    pub calls: Vec<(String, Vec<RowValues>)>,
    pub commits: usize,
    pub raw_closes: usize,
    pub disposed: Vec<String>,
    /// Engines whose statement echo was switched on
    pub echoing: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub callproc: bool,
    pub commit: bool,
    pub dispose: bool,
}

#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub journal: Arc<Mutex<Journal>>,
    pub faults: Faults,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            journal: Arc::default(),
            faults,
        }
    }

    pub fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }

    /// Statements executed, without the engine they ran on.
    pub fn sql(&self) -> Vec<String> {
        self.journal()
            .statements
            .iter()
            .map(|(_, sql)| sql.clone())
            .collect()
    }
}

#[async_trait]
impl ConnectionFactory for RecordingFactory {
    async fn create_engine(
        &self,
        url: &ConnectionUrl,
        options: &EngineOptions,
    ) -> Result<Arc<dyn Engine>, SqlKeywordError> {
        options.reject_unknown("fake", &["flavor"])?;
        self.journal().urls.push(url.as_str().to_string());
        Ok(Arc::new(RecordingEngine {
            url: url.as_str().to_string(),
            journal: Arc::clone(&self.journal),
            faults: self.faults,
        }))
    }
}

pub struct RecordingEngine {
    pub url: String,
    journal: Arc<Mutex<Journal>>,
    faults: Faults,
}

#[async_trait]
impl Engine for RecordingEngine {
    async fn execute(&self, sql: &str) -> Result<ResultSet, SqlKeywordError> {
        self.journal
            .lock()
            .unwrap()
            .statements
            .push((self.url.clone(), sql.to_string()));
        if sql.contains("FAIL") {
            return Err(SqlKeywordError::ExecutionError(format!("rejected: {sql}")));
        }
        let mut rs = ResultSet::with_capacity(1);
        rs.set_column_names(Arc::new(vec!["sql".to_string()]));
        rs.add_row_values(vec![RowValues::Text(sql.to_string())]);
        Ok(rs)
    }

    async fn raw_connection(&self) -> Result<Box<dyn RawConnection>, SqlKeywordError> {
        Ok(Box::new(RecordingRaw {
            journal: Arc::clone(&self.journal),
            faults: self.faults,
        }))
    }

    async fn dispose(&self) -> Result<(), SqlKeywordError> {
        self.journal.lock().unwrap().disposed.push(self.url.clone());
        if self.faults.dispose {
            return Err(SqlKeywordError::ConnectionError(format!(
                "dispose failed for {}",
                self.url
            )));
        }
        Ok(())
    }

    fn set_echo(&self, enabled: bool) {
        let mut journal = self.journal.lock().unwrap();
        if enabled {
            journal.echoing.push(self.url.clone());
        } else {
            journal.echoing.retain(|url| url != &self.url);
        }
    }
}

pub struct RecordingRaw {
    journal: Arc<Mutex<Journal>>,
    faults: Faults,
}

#[async_trait]
impl RawConnection for RecordingRaw {
    async fn callproc(
        &mut self,
        name: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlKeywordError> {
        self.journal
            .lock()
            .unwrap()
            .calls
            .push((name.to_string(), params.to_vec()));
        if self.faults.callproc {
            return Err(SqlKeywordError::ExecutionError(format!("{name} failed")));
        }
        let mut rs = ResultSet::with_capacity(params.len());
        rs.set_column_names(Arc::new(vec!["param".to_string()]));
        for param in params {
            rs.add_row_values(vec![param.clone()]);
        }
        Ok(rs)
    }

    async fn commit(&mut self) -> Result<(), SqlKeywordError> {
        self.journal.lock().unwrap().commits += 1;
        if self.faults.commit {
            return Err(SqlKeywordError::ExecutionError("commit failed".to_string()));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.journal.lock().unwrap().raw_closes += 1;
    }
}
