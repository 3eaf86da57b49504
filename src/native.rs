//! Native (host-implemented) functions installed into the global environment at
//! interpreter construction. Grounded in the teacher's `BUILTINS` phf map
//! (`builtin.rs`), repurposed here to back `Value::Callable(Callable::Native)` instead
//! of compile-time expression rewriting.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::diagnostics::RuntimeError;
use crate::environment::{EnvId, Environments};
use crate::value::{Callable, Value};

fn clock(_args: &[Value]) -> Result<Value, RuntimeError> {
	let elapsed = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock must not be set before the Unix epoch")
		.as_secs_f64();
	Ok(Value::Number(elapsed))
}

struct NativeFn {
	arity: usize,
	func: fn(&[Value]) -> Result<Value, RuntimeError>,
}

static NATIVES: phf::Map<&'static str, NativeFn> = phf::phf_map! {
	"clock" => NativeFn { arity: 0, func: clock },
};

/// Defines every native function into `env`. Called once per interpreter so no global
/// environment is ever shared between two interpreter instances (`spec.md §9`).
pub fn install(envs: &mut Environments, env: EnvId) {
	for (name, native) in NATIVES.entries() {
		let callable = Callable::Native { name, arity: native.arity, func: native.func };
		envs.define(env, name, Value::Callable(Rc::new(callable)));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clock_returns_a_non_negative_number() {
		let value = clock(&[]).unwrap();
		let Value::Number(n) = value else { panic!("clock must return a number") };
		assert!(n >= 0.0);
	}

	#[test]
	fn install_defines_clock_as_zero_arity_callable() {
		let (mut envs, global) = Environments::new();
		install(&mut envs, global);
		let token = crate::token::Token::new(crate::token::TokenKind::Identifier, "clock", crate::token::Literal::None, 1);
		let value = envs.get(global, &token).unwrap();
		let Value::Callable(callable) = value else { panic!("clock must be a callable") };
		assert_eq!(callable.arity(), 0);
	}
}
