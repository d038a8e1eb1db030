//! Lock-free impulse-response switch queue
//!
//! Control threads post switch requests; the audio thread drains them at a
//! block boundary and applies only the most recent one.

use crate::convolution::ConvolutionError;
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

/// Single-producer, single-consumer queue of impulse-response indices
pub struct IrSwitchQueue {
    producer: HeapProducer<usize>,
    consumer: HeapConsumer<usize>,
    capacity: usize,
}

impl IrSwitchQueue {
    /// Create new queue
    ///
    /// # Arguments
    /// * `capacity` - Pending requests held before new ones are refused (>= 1)
    pub fn new(capacity: usize) -> Result<Self, ConvolutionError> {
        if capacity == 0 {
            return Err(ConvolutionError::InvalidQueueCapacity);
        }
        let rb = HeapRb::<usize>::new(capacity);
        let (producer, consumer) = rb.split();

        Ok(Self {
            producer,
            consumer,
            capacity,
        })
    }

    /// Split into control-side and audio-side ends
    pub fn split(self) -> (IrSwitchSender, IrSwitchReceiver) {
        (
            IrSwitchSender {
                producer: self.producer,
            },
            IrSwitchReceiver {
                consumer: self.consumer,
            },
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Control-side end
pub struct IrSwitchSender {
    producer: HeapProducer<usize>,
}

impl IrSwitchSender {
    /// Request a switch to impulse response `index`
    ///
    /// The index is validated by the engine when the request is applied.
    pub fn request(&mut self, index: usize) -> Result<(), ConvolutionError> {
        self.producer.push(index).map_err(|dropped| {
            log::warn!("switch queue full, dropping request for impulse response {}", dropped);
            ConvolutionError::SwitchQueueFull(dropped)
        })
    }

    /// Number of requests that can still be queued
    pub fn free_len(&self) -> usize {
        self.producer.free_len()
    }
}

/// Audio-side end
pub struct IrSwitchReceiver {
    consumer: HeapConsumer<usize>,
}

impl IrSwitchReceiver {
    /// Drain all pending requests and return the most recent one
    pub fn latest(&mut self) -> Option<usize> {
        let mut latest = None;
        while let Some(index) = self.consumer.pop() {
            latest = Some(index);
        }
        latest
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_request_wins() {
        let (mut sender, mut receiver) = IrSwitchQueue::new(8).unwrap().split();
        assert_eq!(receiver.latest(), None);

        sender.request(3).unwrap();
        sender.request(1).unwrap();
        sender.request(4).unwrap();
        assert_eq!(receiver.len(), 3);
        assert_eq!(receiver.latest(), Some(4));
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_full_queue_rejects() {
        let queue = IrSwitchQueue::new(2).unwrap();
        assert_eq!(queue.capacity(), 2);
        let (mut sender, mut receiver) = queue.split();
        sender.request(0).unwrap();
        sender.request(1).unwrap();
        assert_eq!(sender.free_len(), 0);
        assert_eq!(sender.request(2), Err(ConvolutionError::SwitchQueueFull(2)));
        assert_eq!(receiver.latest(), Some(1));
        assert_eq!(sender.free_len(), 2);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            IrSwitchQueue::new(0),
            Err(ConvolutionError::InvalidQueueCapacity)
        ));
        let (mut sender, mut receiver) = IrSwitchQueue::new(1).unwrap().split();
        sender.request(5).unwrap();
        assert_eq!(receiver.latest(), Some(5));
    }

    #[test]
    fn test_cross_thread() {
        let (mut sender, mut receiver) = IrSwitchQueue::new(16).unwrap().split();
        let handle = std::thread::spawn(move || {
            for index in 0..10 {
                sender.request(index).unwrap();
            }
        });
        handle.join().unwrap();
        assert_eq!(receiver.latest(), Some(9));
    }
}
