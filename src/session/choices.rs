/// A labelled option for a multi-select prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

/// Projections picking the label and the value out of an item.
pub struct ChoiceFields<N, V> {
    pub name: N,
    pub value: V,
}

/// Labels for a single-select prompt, in item order.
pub fn build_choices<T>(items: &[T], label: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| label(item).to_string()).collect()
}

/// Name/value pairs for a multi-select prompt, in item order.
pub fn build_multi_choices<T, N, V>(items: &[T], fields: ChoiceFields<N, V>) -> Vec<Choice>
where
    N: Fn(&T) -> String,
    V: Fn(&T) -> String,
{
    items
        .iter()
        .map(|item| Choice {
            name: (fields.name)(item),
            value: (fields.value)(item),
        })
        .collect()
}
