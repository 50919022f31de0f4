/// Actions represent all possible state changes in the demo.
#[derive(Debug, Clone)]
pub enum Action {
    Increment,
    Decrement,
    /// Set the acting user
    Login(String),
    /// Drop back to the absent state
    Reset,
}
