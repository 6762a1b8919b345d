// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use core::{num::NonZeroU16, ops::Range};
use fnplot::{
    eval::Expression,
    label::LabelPlacement,
    map::{self, Viewport},
    sample::Exclusion,
    shell::{self, Bound, Command, NumberList},
    stdlib, Number, Plot, PlotRequest,
};
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    process::ExitCode,
    sync::Arc,
};

const OUTPUT_RES: [Number; 2] = [960.0, 640.0];
const OUTPUT_PADDING: Number = 48.0;

const CURVE_COLOR: &str = "#27422e";
const AXIS_COLOR: &str = "#9a9a9a";

fn output_svg_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "svg"
    )
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    src: Option<Arc<String>>,
    expr: Option<Expression>,
    req: PlotRequest,
    viewport: Viewport,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        src: None,
        expr: None,
        req: PlotRequest::new(-5.0..5.0),
        viewport: Viewport::new(OUTPUT_RES[0], OUTPUT_RES[1], OUTPUT_PADDING),
    };
    state.req.anchors = vec![0.0]; // keep the x axis in view

    let mut stdout = BufWriter::new(stdout());
    set_src(&mut stdout, &mut state, String::from("x^2 - 3x + 2"))?;

    loop {
        if let Some(ref src) = state.src {
            writeln!(stdout, "y = {src}")?;
        } else {
            writeln!(stdout, "y is not set")?;
        }

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetExpr => set_expr(&mut stdout, &mut state)?,

                Command::Plot => plot_expr(&mut stdout, &state)?,

                Command::SetWin => set_win(&mut stdout, &mut state)?,

                Command::SetLabels => set_labels(&mut stdout, &mut state)?,

                Command::SetExclusion => set_exclusion(&mut stdout, &mut state)?,

                Command::PrintProg => {
                    if let Some(ref expr) = state.expr {
                        shell::dump_program(&mut stdout, expr.program(), format_args!("program"))?;
                    } else {
                        shell::expr_undefined(&mut stdout)?;
                    }
                }
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn set_win<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let req = &mut state.req;
    writeln!(out, "domain = {:?}", req.domain)?;
    match req.y {
        Some(ref y) => writeln!(out, "y bounds = {y:?}")?,
        None => writeln!(out, "y bounds = auto")?,
    }
    writeln!(out, "steps = {}", req.sample.step_count)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    for (name, dst) in [
        ("x min", &mut req.domain.start),
        ("x max", &mut req.domain.end),
    ] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    writeln!(out, r#"note: enter "auto" to pick y bounds automatically"#)?;
    let current = [
        Bound(req.y.as_ref().map(|y| y.start)),
        Bound(req.y.as_ref().map(|y| y.end)),
    ];
    let mut entered = [None; 2];
    for ((name, cur), dst) in ["y min", "y max"]
        .into_iter()
        .zip(current)
        .zip(entered.iter_mut())
    {
        match shell::read_fromstr::<_, Bound>(
            &mut out,
            format_args!("?{name} (is {cur}) = "),
            true,
        )? {
            Ok(new) => *dst = new,
            Err(_) => return Ok(()),
        }
    }
    match shell::merge_y_bounds(req.y.clone(), entered) {
        Ok(y) => req.y = y,
        Err(()) => writeln!(
            out,
            "note: set both y bounds to fix them, y bounds are unchanged"
        )?,
    }

    writeln!(out, "note: step count must be a nonzero integer")?;
    match shell::read_fromstr::<_, NonZeroU16>(
        &mut out,
        format_args!("?steps (is {cur}) = ", cur = req.sample.step_count),
        true,
    )? {
        Ok(Some(new)) => req.sample.step_count = usize::from(new.get()),
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    Ok(())
}

fn set_labels<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let cur = NumberList(state.req.labels.clone());
    writeln!(out, "labels = [{cur}]")?;
    writeln!(out, "note: separate x-values with commas, leave blank to clear")?;
    if let Ok(new) = shell::read_fromstr::<_, NumberList>(&mut out, "?labels = ", false)? {
        state.req.labels = new.unwrap_or_default().0;
    }
    Ok(())
}

fn set_exclusion<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let sample = &mut state.req.sample;
    match sample.exclusion {
        Some(Exclusion { x, radius }) => writeln!(out, "excluding |x - {x}| < {radius}")?,
        None => writeln!(out, "no exclusion")?,
    }
    writeln!(out, "note: leave x blank to clear")?;

    let x = match shell::read_fromstr::<_, Number>(&mut out, "?x = ", true)? {
        Ok(Some(x)) => x,
        Ok(None) => {
            sample.exclusion = None;
            return Ok(());
        }
        Err(_) => return Ok(()),
    };
    let default_radius = sample.exclusion.map_or(0.1, |ex| ex.radius);
    let radius = match shell::read_fromstr::<_, Number>(
        &mut out,
        format_args!("?radius (is {default_radius}) = "),
        true,
    )? {
        Ok(radius) => radius.unwrap_or(default_radius),
        Err(_) => return Ok(()),
    };
    sample.exclusion = Some(Exclusion { x, radius });
    Ok(())
}

fn plot_expr<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let Some(ref expr) = state.expr else {
        shell::expr_undefined(&mut out)?;
        return Ok(());
    };

    let plot = fnplot::plot(expr, &state.req, &state.viewport);
    if plot.polylines.is_empty() {
        writeln!(out, "note: expression is undefined or out of view everywhere")?;
    }

    let svg_path = output_svg_filename(Local::now());
    let mut svg = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&svg_path)
            .context("failed to open output svg file")?,
    );
    write_svg(&mut svg, expr, &state.req, &state.viewport, &plot)
        .context("failed to write to output svg file")?;
    svg.flush()?;
    svg.get_mut().sync_data()?;
    drop(svg);

    writeln!(out, "rect = {:#}", plot.rect)?;
    writeln!(
        out,
        "wrote {n} polyline{s} to {svg_path}",
        n = plot.polylines.len(),
        s = if plot.polylines.len() == 1 { "" } else { "s" }
    )?;
    Ok(())
}

fn write_svg<W: Write>(
    mut out: W,
    expr: &Expression,
    req: &PlotRequest,
    viewport: &Viewport,
    plot: &Plot,
) -> std::io::Result<()> {
    let rect = &plot.rect;
    let Viewport {
        width,
        height,
        padding,
    } = *viewport;

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )?;
    // expressions only contain characters that are safe in xml text
    writeln!(out, "  <title>y = {}</title>", expr.source())?;
    writeln!(
        out,
        r#"  <rect x="{padding}" y="{padding}" width="{w}" height="{h}" fill="none" stroke="{AXIS_COLOR}"/>"#,
        w = viewport.inner_width(),
        h = viewport.inner_height(),
    )?;

    // axes, where they are in view
    if (rect.y_min..=rect.y_max).contains(&0.0) {
        let a = map::to_pixel(rect, viewport, rect.x_min, 0.0);
        let b = map::to_pixel(rect, viewport, rect.x_max, 0.0);
        axis(&mut out, a.x..b.x, a.y..b.y)?;
    }
    if (rect.x_min..=rect.x_max).contains(&0.0) {
        let a = map::to_pixel(rect, viewport, 0.0, rect.y_min);
        let b = map::to_pixel(rect, viewport, 0.0, rect.y_max);
        axis(&mut out, a.x..b.x, a.y..b.y)?;
    }

    for line in &plot.polylines {
        write!(out, r#"  <polyline fill="none" stroke="{CURVE_COLOR}" stroke-width="2" points=""#)?;
        for (i, p) in line.points().iter().enumerate() {
            let sep = if i == 0 { "" } else { " " };
            write!(out, "{sep}{:.2},{:.2}", p.x, p.y)?;
        }
        writeln!(out, r#""/>"#)?;
    }

    for (&x, label) in req.labels.iter().zip(&plot.labels) {
        let text = match expr.eval(x) {
            Some(y) => format!("({x:.2}, {y:.2})"),
            None => format!("x = {x:.2} (undefined)"),
        };
        write_label(&mut out, label, &text)?;
    }

    writeln!(out, "</svg>")?;
    Ok(())
}

fn axis<W: Write>(mut out: W, x: Range<Number>, y: Range<Number>) -> std::io::Result<()> {
    writeln!(
        out,
        r#"  <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{AXIS_COLOR}"/>"#,
        x.start, y.start, x.end, y.end
    )
}

fn write_label<W: Write>(mut out: W, label: &LabelPlacement, text: &str) -> std::io::Result<()> {
    writeln!(
        out,
        r#"  <circle cx="{:.2}" cy="{:.2}" r="3" fill="{CURVE_COLOR}"/>"#,
        label.x, label.y
    )?;
    writeln!(
        out,
        r#"  <text x="{:.2}" y="{:.2}" text-anchor="{}" dominant-baseline="middle" font-size="12">{text}</text>"#,
        label.x + label.offset_x,
        label.y + label.offset_y,
        label.anchor.as_str()
    )
}

fn set_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    // read input expression
    let input = shell::input(&mut out, "y = ")?;
    if input.is_empty() {
        return Ok(());
    }
    set_src(out, state, input)
}

fn set_src<W: Write>(mut out: W, state: &mut State, input: String) -> anyhow::Result<()> {
    let src = Arc::new(input);
    state.expr = None;
    state.src = Some(Arc::clone(&src));

    // lex, parse & compile input
    match fnplot::compile_with(src, stdlib::idents()) {
        Ok(expr) => state.expr = Some(expr),
        Err(err) => shell::report_parse_err(&mut out, &err, stdlib::idents())?,
    }
    Ok(())
}
