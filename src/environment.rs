use std::collections::HashMap;

use crate::diagnostics::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// Index of an environment in the arena. Stable for the process's lifetime — arena slots
/// are never removed — so a closure can hold one as plain, `Copy` data instead of a
/// reference-counted pointer.
pub type EnvId = usize;

struct EnvNode {
	values: HashMap<String, Value>,
	enclosing: Option<EnvId>,
}

/// The full chain of lexical scopes as a flat arena, one node per block/call/global
/// scope, addressed by index. Grounded in the teacher's `ScopeData`/`Scope` arena
/// (`api/scope.rs`): "trying to create a tree data structure in Rust with regular
/// semantics can get really tricky... Using indices and an arena Vec is likely the best
/// option." A closure capturing an `EnvId` keeps that slot reachable simply by virtue of
/// never being removed; potential reference cycles between a function value and the
/// scope that declares it (`spec.md §5`) are therefore never a problem, matching the
/// spec's arena-with-indices design note.
pub struct Environments {
	nodes: Vec<EnvNode>,
}

impl Environments {
	/// Creates an arena containing only the global environment, returning its id (always
	/// `0`).
	#[must_use]
	pub fn new() -> (Self, EnvId) {
		let arena = Self {
			nodes: vec![EnvNode { values: HashMap::new(), enclosing: None }],
		};
		(arena, 0)
	}

	/// Creates a new environment enclosed by `enclosing` and returns its id.
	pub fn child(&mut self, enclosing: EnvId) -> EnvId {
		self.nodes.push(EnvNode { values: HashMap::new(), enclosing: Some(enclosing) });
		self.nodes.len() - 1
	}

	/// Unconditionally writes into `env`'s local mapping, permitting redeclaration at the
	/// same scope (`spec.md §4.5`).
	pub fn define(&mut self, env: EnvId, name: &str, value: Value) {
		self.nodes[env].values.insert(name.to_owned(), value);
	}

	/// Walks the enclosing chain from `env` outward looking for `name`, overwriting the
	/// first mapping found; errors if no scope in the chain declares it.
	pub fn assign(&mut self, env: EnvId, name: &Token, value: Value) -> Result<(), RuntimeError> {
		let mut cursor = Some(env);
		while let Some(id) = cursor {
			let node = &mut self.nodes[id];
			if node.values.contains_key(&name.lexeme) {
				node.values.insert(name.lexeme.clone(), value);
				return Ok(());
			}
			cursor = node.enclosing;
		}
		Err(RuntimeError::new(name.clone(), format!("Undefined variable '{}'.", name.lexeme)))
	}

	/// Symmetric to `assign`: walks the enclosing chain from `env` outward looking for
	/// `name`. Reports a distinct message from `assign`'s miss — "Undefined name", not
	/// "Undefined variable" — matching `spec.md §4.5` and the original's
	/// `environment.py` (`get` raises `Undefined name`, `assign` raises
	/// `Undefined variable`).
	pub fn get(&self, env: EnvId, name: &Token) -> Result<Value, RuntimeError> {
		let mut cursor = Some(env);
		while let Some(id) = cursor {
			let node = &self.nodes[id];
			if let Some(value) = node.values.get(&name.lexeme) {
				return Ok(value.clone());
			}
			cursor = node.enclosing;
		}
		Err(RuntimeError::new(name.clone(), format!("Undefined name '{}'.", name.lexeme)))
	}

	/// Walks the enclosing pointer `depth` times from `env`. The depth-indexed variants
	/// presume the resolver's contract and must not fall back to chain-walking beyond
	/// `depth` (`spec.md §4.5`).
	fn ancestor(&self, env: EnvId, depth: usize) -> EnvId {
		let mut id = env;
		for _ in 0..depth {
			id = self.nodes[id].enclosing.expect("resolver-computed depth must not exceed the environment chain's length");
		}
		id
	}

	pub fn get_at(&self, env: EnvId, depth: usize, name: &str) -> Value {
		let id = self.ancestor(env, depth);
		self.nodes[id]
			.values
			.get(name)
			.cloned()
			.unwrap_or_else(|| panic!("resolver contract violated: no binding for '{name}' at resolved depth {depth}"))
	}

	pub fn assign_at(&mut self, env: EnvId, depth: usize, name: &str, value: Value) {
		let id = self.ancestor(env, depth);
		self.nodes[id].values.insert(name.to_owned(), value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::{Literal, TokenKind};

	fn name(lexeme: &str) -> Token {
		Token::new(TokenKind::Identifier, lexeme, Literal::None, 1)
	}

	#[test]
	fn define_then_get_round_trips() {
		let (mut envs, global) = Environments::new();
		envs.define(global, "a", Value::Number(1.0));
		assert_eq!(envs.get(global, &name("a")).unwrap(), Value::Number(1.0));
	}

	#[test]
	fn get_walks_enclosing_chain() {
		let (mut envs, global) = Environments::new();
		envs.define(global, "a", Value::Number(1.0));
		let child = envs.child(global);
		assert_eq!(envs.get(child, &name("a")).unwrap(), Value::Number(1.0));
	}

	#[test]
	fn assign_overwrites_nearest_declaring_scope_not_a_shadow() {
		let (mut envs, global) = Environments::new();
		envs.define(global, "a", Value::Number(1.0));
		let child = envs.child(global);
		envs.assign(child, &name("a"), Value::Number(2.0)).unwrap();
		assert_eq!(envs.get(global, &name("a")).unwrap(), Value::Number(2.0));
	}

	#[test]
	fn assign_to_undefined_global_is_an_error() {
		let (mut envs, global) = Environments::new();
		assert!(envs.assign(global, &name("missing"), Value::Nil).is_err());
	}

	#[test]
	fn get_at_reads_the_exact_ancestor_without_walking_further() {
		let (mut envs, global) = Environments::new();
		envs.define(global, "a", Value::Number(1.0));
		let child = envs.child(global);
		envs.define(child, "a", Value::Number(2.0));
		assert_eq!(envs.get_at(child, 0, "a"), Value::Number(2.0));
		assert_eq!(envs.get_at(child, 1, "a"), Value::Number(1.0));
	}

	#[test]
	fn define_permits_redeclaration_in_the_same_scope() {
		let (mut envs, global) = Environments::new();
		envs.define(global, "a", Value::Number(1.0));
		envs.define(global, "a", Value::Number(2.0));
		assert_eq!(envs.get(global, &name("a")).unwrap(), Value::Number(2.0));
	}
}
