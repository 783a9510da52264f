use chimera_node_kit::base::{NodeDispatcher, RegisterNodeError};

mod consumer;
mod generator;

pub use consumer::Consumer;
pub use generator::Generator;

/// Register every node in this crate into `dispatcher`.
pub fn register(dispatcher: &mut NodeDispatcher) -> Result<(), RegisterNodeError> {
	dispatcher.register_node("Generator", &|arguments| {
		Ok(Box::new(Generator::new(arguments)?))
	})?;
	dispatcher.register_node("Consumer", &|arguments| {
		Ok(Box::new(Consumer::new(arguments)?))
	})?;

	return Ok(());
}
