//! Bounded, insertion-ordered store of the most recent readings.
//!
//! Cloning a [`LiveBuffer`] yields another handle to the same storage; the
//! push endpoint and the polling collector are both wired with one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::SensorReading;

// ---

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct LiveBuffer {
    inner: Arc<Mutex<VecDeque<SensorReading>>>,
    capacity: usize,
}

impl LiveBuffer {
    /// Create an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        // ---
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    // The lock is never held across an await, so a poisoned lock can only
    // come from a panic mid-append; the deque itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<SensorReading>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a reading, evicting the oldest entries beyond capacity.
    /// Returns how many readings were evicted.
    pub fn append(&self, reading: SensorReading) -> usize {
        // ---
        let mut readings = self.lock();
        readings.push_back(reading);

        let mut evicted = 0;
        while readings.len() > self.capacity {
            readings.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Point-in-time copy of the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<SensorReading> {
        self.lock().iter().cloned().collect()
    }

    /// Most recently appended reading.
    pub fn latest(&self) -> Option<SensorReading> {
        self.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LiveBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::SensorValues;
    use chrono::{Duration, TimeZone, Utc};

    fn create_test_reading(n: i64) -> SensorReading {
        // ---
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(n);
        SensorReading::new(ts, format!("sensor-{}", n), SensorValues::default(), None).unwrap()
    }

    #[test]
    fn test_keeps_last_capacity_readings_in_arrival_order() {
        // ---
        let buffer = LiveBuffer::new(5);
        let mut evicted = 0;
        for n in 0..12 {
            evicted += buffer.append(create_test_reading(n));
        }

        let ids: Vec<String> = buffer.snapshot().into_iter().map(|r| r.sensor_id).collect();
        assert_eq!(
            ids,
            vec!["sensor-7", "sensor-8", "sensor-9", "sensor-10", "sensor-11"]
        );
        assert_eq!(evicted, 7);
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_order_is_arrival_not_timestamp() {
        // ---
        let buffer = LiveBuffer::new(10);
        buffer.append(create_test_reading(50));
        buffer.append(create_test_reading(1));

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot[0].sensor_id, "sensor-50");
        assert_eq!(buffer.latest().unwrap().sensor_id, "sensor-1");
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        // ---
        let buffer = LiveBuffer::new(3);
        buffer.append(create_test_reading(1));

        let snapshot = buffer.snapshot();
        buffer.append(create_test_reading(2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_clones_share_storage() {
        // ---
        let buffer = LiveBuffer::new(3);
        let handle = buffer.clone();
        handle.append(create_test_reading(1));

        assert_eq!(buffer.len(), 1);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        // ---
        let buffer = LiveBuffer::new(0);
        buffer.append(create_test_reading(1));
        buffer.append(create_test_reading(2));

        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.latest().unwrap().sensor_id, "sensor-2");
    }

    #[test]
    fn test_empty_buffer() {
        // ---
        let buffer = LiveBuffer::default();
        assert!(buffer.is_empty());
        assert!(buffer.latest().is_none());
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
    }
}
