//! The eight 64-bit counters returned by the `STATISTICS` verb (§4.4),
//! reported in network byte order.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ProxyStats {
    pub front_msg_in: AtomicU64,
    pub front_bytes_in: AtomicU64,
    pub front_msg_out: AtomicU64,
    pub front_bytes_out: AtomicU64,
    pub back_msg_in: AtomicU64,
    pub back_bytes_in: AtomicU64,
    pub back_msg_out: AtomicU64,
    pub back_bytes_out: AtomicU64,
}

impl ProxyStats {
    pub fn record_front_in(&self, bytes: u64) {
        self.front_msg_in.fetch_add(1, Ordering::Relaxed);
        self.front_bytes_in.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_front_out(&self, bytes: u64) {
        self.front_msg_out.fetch_add(1, Ordering::Relaxed);
        self.front_bytes_out.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_back_in(&self, bytes: u64) {
        self.back_msg_in.fetch_add(1, Ordering::Relaxed);
        self.back_bytes_in.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_back_out(&self, bytes: u64) {
        self.back_msg_out.fetch_add(1, Ordering::Relaxed);
        self.back_bytes_out.fetch_add(bytes, Ordering::Relaxed);
    }

    /// The eight counters, in network (big-endian) byte order, concatenated.
    pub fn to_wire(&self) -> Vec<u8> {
        let values = [
            &self.front_msg_in,
            &self.front_bytes_in,
            &self.front_msg_out,
            &self.front_bytes_out,
            &self.back_msg_in,
            &self.back_bytes_in,
            &self.back_msg_out,
            &self.back_bytes_out,
        ];
        let mut out = Vec::with_capacity(8 * 8);
        for v in values {
            out.extend_from_slice(&v.load(Ordering::Relaxed).to_be_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let stats = ProxyStats::default();
        assert_eq!(stats.to_wire(), vec![0u8; 64]);
    }

    #[test]
    fn records_front_and_back_traffic_independently() {
        let stats = ProxyStats::default();
        stats.record_front_in(100);
        stats.record_back_out(50);
        let wire = stats.to_wire();
        assert_eq!(&wire[0..8], 1u64.to_be_bytes().as_slice());
        assert_eq!(&wire[8..16], 100u64.to_be_bytes().as_slice());
        assert_eq!(&wire[48..56], 1u64.to_be_bytes().as_slice());
        assert_eq!(&wire[56..64], 50u64.to_be_bytes().as_slice());
    }
}
