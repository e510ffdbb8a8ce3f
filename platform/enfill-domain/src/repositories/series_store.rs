use crate::value_objects::series::CanonicalSeries;

/// Port for persisting a fully populated series. The pipeline itself never
/// performs storage I/O; an adapter implements this after the run.
pub trait SeriesStore {
    /// Stores every point and returns the number of rows written.
    fn store(&self, series: &CanonicalSeries) -> Result<u64, String>;
}
