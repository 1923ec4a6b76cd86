use miette::Result;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> Result<()> {
    println!("typeprobe {VERSION}");
    Ok(())
}
