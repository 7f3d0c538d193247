//! `cargo xtask decode`: the on-target report, rendered on the host.
//!
//! Halted in a debugger with no console attached, copy HFSR/CFSR/MMFAR/BFAR
//! out of the SCB (0xE000ED2C, 0xE000ED28, 0xE000ED34, 0xE000ED38) and the
//! eight stacked words, and this prints exactly what the firmware would have.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use embedded_io::{ErrorKind, ErrorType, Write};
use hardfault::{classify, DiagnosticReporter, ExceptionStackFrame, HardwareFaultStatus};

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// HardFault Status Register
    #[arg(long, value_parser = parse_word)]
    pub hfsr: u32,
    /// Configurable Fault Status Register
    #[arg(long, value_parser = parse_word)]
    pub cfsr: u32,
    /// MemManage Fault Address Register
    #[arg(long, value_parser = parse_word, default_value = "0")]
    pub mmfar: u32,
    /// BusFault Address Register
    #[arg(long, value_parser = parse_word, default_value = "0")]
    pub bfar: u32,
    /// Stacked frame: r0,r1,r2,r3,r12,lr,pc,psr
    #[arg(long, value_parser = parse_frame)]
    pub frame: Option<ExceptionStackFrame>,
}

/// Parse a 32-bit register value: `0x`-prefixed hex, or decimal.
/// Underscores are ignored so values can be pasted as `0x0000_8200`.
pub fn parse_word(text: &str) -> Result<u32> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    let parsed = match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => cleaned.parse(),
    };
    parsed.with_context(|| format!("`{text}` is not a 32-bit register value"))
}

/// Parse eight comma-separated words in push order.
pub fn parse_frame(text: &str) -> Result<ExceptionStackFrame> {
    let words = text
        .split(',')
        .map(parse_word)
        .collect::<Result<Vec<_>>>()?;
    let Ok(words) = <[u32; 8]>::try_from(words.as_slice()) else {
        bail!(
            "a stack frame is 8 words (r0,r1,r2,r3,r12,lr,pc,psr), got {}",
            words.len()
        );
    };
    Ok(ExceptionStackFrame::from_raw(words))
}

/// Growable in-memory report sink.
#[derive(Default)]
struct ReportBuffer(Vec<u8>);

impl ErrorType for ReportBuffer {
    type Error = ErrorKind;
}

impl Write for ReportBuffer {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Render the report text for `args`.
pub fn render(args: &DecodeArgs) -> Result<String> {
    let status = HardwareFaultStatus::from_raw(args.hfsr, args.cfsr, args.mmfar, args.bfar);
    let frame = args.frame.unwrap_or_default();

    let mut buffer = ReportBuffer::default();
    DiagnosticReporter::new(&mut buffer)
        .render(&classify(&status), &frame)
        .context("rendering the report")?;
    String::from_utf8(buffer.0).context("report is not UTF-8")
}

pub fn run(args: &DecodeArgs) -> Result<()> {
    let report = render(args)?;

    println!();
    match classify(&HardwareFaultStatus::from_raw(args.hfsr, args.cfsr, args.mmfar, args.bfar))
        .forced()
    {
        Some(forced) => {
            let causes = forced.all_causes();
            println!(
                "{}",
                format!("🔍 Forced hard fault, {} recognised cause(s)", causes.len())
                    .cyan()
                    .bold()
            );
            for cause in causes.iter() {
                println!(
                    "   {} {}",
                    cause.category().heading().trim_end().dimmed(),
                    cause.text().trim_end().replace('\n', " ").yellow()
                );
            }
        }
        None => println!(
            "{}",
            "🔍 Not a forced hard fault: only HFSR is decoded".cyan().bold()
        ),
    }
    if args.frame.is_none() {
        println!(
            "   {}",
            "No --frame given: register dump and fault address are zero".dimmed()
        );
    }
    println!();
    print!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hardfault::ReportError;

    fn args(hfsr: u32, cfsr: u32, frame: Option<&str>) -> DecodeArgs {
        DecodeArgs {
            hfsr,
            cfsr,
            mmfar: 0,
            bfar: 0x2002_0000,
            frame: frame.map(|f| parse_frame(f).unwrap()),
        }
    }

    #[test]
    fn parse_word_accepts_hex_decimal_and_underscores() {
        assert_eq!(parse_word("0x0000_8200").unwrap(), 0x8200);
        assert_eq!(parse_word("0XDEADBEEF").unwrap(), 0xdead_beef);
        assert_eq!(parse_word("42").unwrap(), 42);
        assert!(parse_word("0x1_0000_0000").is_err());
        assert!(parse_word("zz").is_err());
    }

    #[test]
    fn parse_frame_needs_exactly_eight_words() {
        let frame = parse_frame("1,2,3,4,0xc,0x08000101,0x08000200,0x01000000").unwrap();
        assert_eq!(frame.pc, 0x0800_0200);
        assert_eq!(frame.r12, 0xc);

        let err = parse_frame("1,2,3").unwrap_err();
        assert!(err.to_string().contains("got 3"));
    }

    #[test]
    fn render_matches_target_layout() {
        let report = render(&args(
            0x4000_0000,
            0x0000_8200,
            Some("0,0,0,0,0,0x08000101,0x08000200,0x01000000"),
        ))
        .unwrap();
        assert!(report.starts_with("Hard Fault!!!\nSCB->HFSR = 0x40000000\nForced Hard Fault\n"));
        assert!(report.contains("Bus fault: 8200\nPrecise data bus error\n"));
        assert!(report.contains("BFAR value = 0x20020000\n"));
        assert!(report.contains("Hard fault occurred at address 0x08000200.\n"));
    }

    #[test]
    fn report_errors_carry_context_through_anyhow() {
        let err = Err::<(), _>(ReportError::Sink)
            .context("rendering the report")
            .unwrap_err();
        assert_eq!(err.to_string(), "rendering the report");
        assert_eq!(err.root_cause().to_string(), "output sink rejected a write");

        let err: anyhow::Error = ReportError::LineOverflow.into();
        assert!(err.to_string().contains("line buffer"));
    }

    #[test]
    fn render_without_frame_uses_zeroes() {
        let report = render(&args(0x0000_0002, 0, None)).unwrap();
        assert!(report.contains("pc  = 0x00000000\n"));
        assert!(report.contains("Hard fault occurred at address 0x00000000.\n"));
    }
}
