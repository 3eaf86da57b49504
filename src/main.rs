fn main() -> anyhow::Result<()> {
	let code = plox::cli::main()?;
	std::process::exit(code);
}
