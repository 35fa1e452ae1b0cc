use std::sync::{Arc, Mutex, MutexGuard};
use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use crate::drivers::{DaqError, SampleBlock};
/// Fixed-capacity per-channel store that keeps the newest samples.
///
/// `storage[:, ..ptr]` always holds the most recent `ptr` samples of every
/// channel in time order. When an append would run past the end, the
/// contents are shifted left so the oldest samples fall off first.
#[derive(Clone, Debug)]
pub struct RingBuffer {
    storage: Array2<f64>, // channels x capacity
    ptr: usize,
}
impl RingBuffer {
    pub fn new(channel_count: usize, capacity: usize) -> Result<Self, DaqError> {
        if channel_count == 0 || capacity == 0 {
            return Err(DaqError::InvalidInput(format!(
                "ring buffer needs at least one channel and one sample, got {channel_count}x{capacity}"
            )));
        }
        Ok(Self {
            storage: Array2::zeros((channel_count, capacity)),
            ptr: 0,
        })
    }
    pub fn channel_count(&self) -> usize {
        self.storage.nrows()
    }
    pub fn capacity(&self) -> usize {
        self.storage.ncols()
    }
    /// Samples currently held per channel.
    pub fn len(&self) -> usize {
        self.ptr
    }
    pub fn is_empty(&self) -> bool {
        self.ptr == 0
    }
    pub fn is_full(&self) -> bool {
        self.ptr == self.capacity()
    }
    pub fn append(&mut self, block: &SampleBlock) -> Result<(), DaqError> {
        self.append_samples(block.samples().view())
    }
    /// Appends a 1-D block to a single-channel buffer.
    pub fn append_channel(&mut self, samples: ArrayView1<f64>) -> Result<(), DaqError> {
        if self.channel_count() != 1 {
            return Err(DaqError::ShapeMismatch {
                expected: self.channel_count(),
                actual: 1,
            });
        }
        self.append_samples(samples.insert_axis(Axis(0)))
    }
    pub fn append_samples(&mut self, samples: ArrayView2<f64>) -> Result<(), DaqError> {
        if samples.nrows() != self.channel_count() {
            return Err(DaqError::ShapeMismatch {
                expected: self.channel_count(),
                actual: samples.nrows(),
            });
        }
        let capacity = self.capacity();
        // Only the newest `capacity` samples of an oversized block can survive.
        let cols = samples.ncols();
        let incoming = if cols > capacity {
            samples.slice_move(s![.., cols - capacity..])
        } else {
            samples
        };
        let n = incoming.ncols();
        if n == 0 {
            return Ok(());
        }
        if self.ptr + n > capacity {
            let overflow = self.ptr + n - capacity;
            let kept = self.storage.slice(s![.., overflow..self.ptr]).to_owned();
            self.ptr = capacity - n;
            self.storage.slice_mut(s![.., ..self.ptr]).assign(&kept);
        }
        self.storage
            .slice_mut(s![.., self.ptr..self.ptr + n])
            .assign(&incoming);
        self.ptr += n;
        Ok(())
    }
    /// Most recent `count` samples per channel, or all of them if fewer are held.
    pub fn snapshot(&self, count: usize) -> Array2<f64> {
        let take = count.min(self.ptr);
        self.storage
            .slice(s![.., self.ptr - take..self.ptr])
            .to_owned()
    }
    pub fn contents(&self) -> ArrayView2<f64> {
        self.storage.slice(s![.., ..self.ptr])
    }
    pub fn clear(&mut self) {
        self.storage.fill(0.0);
        self.ptr = 0;
    }
}
/// Thread-safe handle for appending and reading from different threads.
#[derive(Clone, Debug)]
pub struct SharedRingBuffer {
    inner: Arc<Mutex<RingBuffer>>,
}
impl SharedRingBuffer {
    pub fn new(buffer: RingBuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }
    fn lock(&self) -> MutexGuard<'_, RingBuffer> {
        // Appends never leave the buffer half-written, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
    pub fn append(&self, block: &SampleBlock) -> Result<(), DaqError> {
        self.lock().append(block)
    }
    pub fn snapshot(&self, count: usize) -> Array2<f64> {
        self.lock().snapshot(count)
    }
    pub fn clear(&self) {
        self.lock().clear()
    }
    pub fn len(&self) -> usize {
        self.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use std::thread;
    use std::time::SystemTime;
    fn ramp(start: usize, len: usize) -> Array2<f64> {
        Array1::from_iter((start..start + len).map(|v| v as f64))
            .into_shape((1, len))
            .unwrap()
    }
    fn block(samples: Array2<f64>) -> SampleBlock {
        SampleBlock::new(samples, SystemTime::now()).unwrap()
    }
    #[test]
    fn fourth_block_of_thirty_evicts_oldest_twenty() {
        let mut buffer = RingBuffer::new(1, 100).unwrap();
        for i in 0..4 {
            buffer.append(&block(ramp(1 + i * 30, 30))).unwrap();
        }
        assert_eq!(buffer.len(), 100);
        let snapshot = buffer.snapshot(100);
        let expected = ramp(21, 100);
        assert_eq!(snapshot, expected);
    }
    #[test]
    fn snapshot_returns_newest_in_order_after_many_appends() {
        let capacity = 37;
        let mut buffer = RingBuffer::new(2, capacity).unwrap();
        let mut next = 0usize;
        for len in [5, 13, 1, 40, 9, 22, 3, 37, 11] {
            let ch0 = ramp(next, len);
            let ch1 = ch0.mapv(|v| -v);
            let samples = ndarray::concatenate![ndarray::Axis(0), ch0, ch1];
            buffer.append(&block(samples)).unwrap();
            next += len;
            let held = next.min(capacity);
            assert_eq!(buffer.len(), held);
            let snapshot = buffer.snapshot(capacity);
            assert_eq!(snapshot.row(0).to_owned(), ramp(next - held, held).row(0));
            assert_eq!(snapshot.row(1).to_owned(), ramp(next - held, held).row(0).mapv(|v| -v));
        }
    }
    #[test]
    fn snapshot_before_filled_returns_what_exists() {
        let mut buffer = RingBuffer::new(1, 10).unwrap();
        assert_eq!(buffer.snapshot(5).dim(), (1, 0));
        buffer.append_channel(array![1.0, 2.0, 3.0].view()).unwrap();
        assert_eq!(buffer.snapshot(5), array![[1.0, 2.0, 3.0]]);
        assert_eq!(buffer.snapshot(2), array![[2.0, 3.0]]);
        assert_eq!(buffer.len(), 3);
    }
    #[test]
    fn strided_channel_views_are_accepted() {
        let mut buffer = RingBuffer::new(1, 8).unwrap();
        let m = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        buffer.append_channel(m.column(0)).unwrap();
        let a = array![4.0, 0.0, 5.0, 0.0, 6.0];
        buffer.append_channel(a.slice(s![..;2])).unwrap();
        assert_eq!(buffer.contents(), array![[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]]);
    }
    #[test]
    fn mismatched_channels_leave_state_untouched() {
        let mut buffer = RingBuffer::new(2, 8).unwrap();
        buffer.append(&block(array![[1.0, 2.0], [3.0, 4.0]])).unwrap();
        let before = buffer.clone();
        let err = buffer.append(&block(array![[9.0, 9.0, 9.0]])).unwrap_err();
        assert!(matches!(err, DaqError::ShapeMismatch { expected: 2, actual: 1 }));
        assert_eq!(buffer.len(), before.len());
        assert_eq!(buffer.storage, before.storage);
        let err = buffer.append_channel(array![1.0].view()).unwrap_err();
        assert!(matches!(err, DaqError::ShapeMismatch { .. }));
        assert_eq!(buffer.storage, before.storage);
    }
    #[test]
    fn oversized_block_keeps_its_tail() {
        let mut buffer = RingBuffer::new(1, 4).unwrap();
        buffer.append(&block(ramp(0, 3))).unwrap();
        buffer.append(&block(ramp(10, 6))).unwrap();
        assert_eq!(buffer.snapshot(4), ramp(12, 4));
        assert!(buffer.is_full());
    }
    #[test]
    fn clear_zeroes_and_resets() {
        let mut buffer = RingBuffer::new(1, 4).unwrap();
        buffer.append(&block(ramp(1, 4))).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.storage.iter().all(|v| *v == 0.0));
        assert_eq!(buffer.snapshot(4).ncols(), 0);
    }
    #[test]
    fn shared_buffer_serializes_cross_thread_appends() {
        let shared = SharedRingBuffer::new(RingBuffer::new(1, 1000).unwrap());
        let writer = shared.clone();
        let handle = thread::spawn(move || {
            for i in 0..50 {
                writer.append(&block(ramp(i * 10, 10))).unwrap();
            }
        });
        for _ in 0..50 {
            let snapshot = shared.snapshot(1000);
            let row = snapshot.row(0);
            assert!(row.iter().zip(row.iter().skip(1)).all(|(a, b)| b - a == 1.0));
        }
        handle.join().unwrap();
        assert_eq!(shared.snapshot(1000), ramp(0, 500));
    }
}
