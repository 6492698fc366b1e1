use super::typed::TypedSeries;

/// Result of merging one series into a [`SeriesSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    Added,
    /// A series with the same SeriesInstanceUID was already present and was replaced
    Replaced,
}

/// Destination collection of typed series, in merge order
#[derive(Debug, Clone, Default)]
pub struct SeriesSet {
    series: Vec<TypedSeries>,
}

impl SeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a series, replacing in place any series with the same identity
    pub fn merge(&mut self, series: TypedSeries) -> MergeResult {
        match self
            .series
            .iter()
            .position(|s| s.instance_uid() == series.instance_uid())
        {
            Some(index) => {
                self.series[index] = series;
                MergeResult::Replaced
            }
            None => {
                self.series.push(series);
                MergeResult::Added
            }
        }
    }

    pub fn get(&self, instance_uid: &str) -> Option<&TypedSeries> {
        self.series.iter().find(|s| s.instance_uid() == instance_uid)
    }

    pub fn contains(&self, instance_uid: &str) -> bool {
        self.get(instance_uid).is_some()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypedSeries> {
        self.series.iter()
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    /// Series UIDs, in order
    pub fn instance_uids(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.instance_uid()).collect()
    }
}

impl<'a> IntoIterator for &'a SeriesSet {
    type Item = &'a TypedSeries;
    type IntoIter = std::slice::Iter<'a, TypedSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.iter()
    }
}

impl IntoIterator for SeriesSet {
    type Item = TypedSeries;
    type IntoIter = std::vec::IntoIter<TypedSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.into_iter()
    }
}
