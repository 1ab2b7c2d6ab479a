use crate::config::CacheSettings;
use crate::domain::model::StockQuote;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct CacheEntry {
    quote: StockQuote,
    inserted_at: Instant,
    last_used: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// 報價 LRU 快取，key 為大寫代號
pub struct QuoteCache {
    capacity: usize,
    ttl: Option<Duration>,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    tick: u64,
}

impl QuoteCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            capacity: settings.capacity.max(1),
            ttl: settings.ttl,
            inner: Mutex::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, symbol: &str) -> Option<StockQuote> {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        let expired = match inner.entries.get(symbol) {
            Some(entry) => self
                .ttl
                .map(|ttl| entry.inserted_at.elapsed() >= ttl)
                .unwrap_or(false),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            inner.entries.remove(symbol);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let entry = inner.entries.get_mut(symbol)?;
        entry.last_used = tick;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.quote.clone())
    }

    pub fn insert(&self, symbol: &str, quote: StockQuote) {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.entries.contains_key(symbol) && inner.entries.len() >= self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Evicting {} from quote cache", oldest);
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(
            symbol.to_string(),
            CacheEntry {
                quote,
                inserted_at: Instant::now(),
                last_used: tick,
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().entries.len(),
        }
    }
}
