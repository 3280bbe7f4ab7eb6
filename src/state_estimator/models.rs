pub mod coordinated_turn;
pub mod linear;

pub use coordinated_turn::CoordinatedTurn;
pub use linear::LinearSystem;

/// A system to be estimated: a transition function over the state and a
/// measurement function mapping states to expected observations. No
/// Jacobians are required; the cubature transform only evaluates the
/// functions themselves.
pub trait SystemModel {
    type State;
    type Input;
    type Measurement;

    fn f(&self, x: &Self::State, u: &Self::Input) -> Self::State;
    fn h(&self, x: &Self::State) -> Self::Measurement;
}
