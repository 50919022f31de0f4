/// Demo application state: a counter and the user who last touched it
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AppState {
    pub value: i64,
    pub user: String,
}
