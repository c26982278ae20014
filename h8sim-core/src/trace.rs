/// Receives one record per executed step.
pub trait TraceSink<R> {
    fn record(&mut self, record: &R);
}

impl<R: Clone> TraceSink<R> for Vec<R> {
    fn record(&mut self, record: &R) {
        self.push(record.clone());
    }
}

/// Discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl<R> TraceSink<R> for NullSink {
    fn record(&mut self, _: &R) {}
}

impl<R, S: TraceSink<R> + ?Sized> TraceSink<R> for &mut S {
    fn record(&mut self, record: &R) {
        (**self).record(record);
    }
}
