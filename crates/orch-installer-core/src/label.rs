//! Label-based selection of stages and steps

/// Anything that carries a label set
pub trait Labeled {
    fn labels(&self) -> &[String];
}

impl<T: Labeled + ?Sized> Labeled for Box<T> {
    fn labels(&self) -> &[String] {
        (**self).labels()
    }
}

impl<T: Labeled + ?Sized> Labeled for &T {
    fn labels(&self) -> &[String] {
        (**self).labels()
    }
}

impl<T: Labeled + ?Sized> Labeled for &mut T {
    fn labels(&self) -> &[String] {
        (**self).labels()
    }
}

/// Whether `labels` intersects `targets`. An empty target set matches
/// everything.
pub fn matches_labels(labels: &[String], targets: &[String]) -> bool {
    targets.is_empty() || labels.iter().any(|label| targets.contains(label))
}

/// Keep the items whose labels intersect `targets`, in their original order.
pub fn filter_by_labels<I>(items: I, targets: &[String]) -> Vec<I::Item>
where
    I: IntoIterator,
    I::Item: Labeled,
{
    items
        .into_iter()
        .filter(|item| matches_labels(item.labels(), targets))
        .collect()
}
