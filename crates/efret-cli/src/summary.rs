use console::Style;
use efret_core::crosstalk::{
    CalibrationKind, CrosstalkCoefficients, CrosstalkReport, RegistrationFailure,
};
use efret_core::fret::GReport;
use efret_core::pipeline::config::ExperimentConfig;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    error: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            error: Style::new().red(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

fn fmt_p(p: f64) -> String {
    if p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}

pub fn print_experiment_summary(config: &ExperimentConfig) {
    let s = Styles::new();
    print_title(&s, "eFRET Experiment");

    match config.calibration {
        Some(ref cal) => {
            println!("  {}", s.header.apply_to("Calibration"));
            println!(
                "    {:<12}{}",
                s.label.apply_to("Data"),
                s.path.apply_to(cal.data_dir.display())
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("Acceptors"),
                s.value.apply_to(cal.acceptors.len())
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("Donors"),
                s.value.apply_to(cal.donors.len())
            );
        }
        None => println!(
            "  {:<14}{}",
            s.header.apply_to("Calibration"),
            s.disabled.apply_to("none")
        ),
    }
    println!();

    match config.bleach {
        Some(ref bleach) => {
            println!("  {}", s.header.apply_to("Bleach pairs"));
            println!(
                "    {:<12}{}",
                s.label.apply_to("Data"),
                s.path.apply_to(bleach.data_dir.display())
            );
            println!(
                "    {:<12}{}",
                s.label.apply_to("Pairs"),
                s.value.apply_to(bleach.registrations.len())
            );
        }
        None => println!(
            "  {:<14}{}",
            s.header.apply_to("Bleach pairs"),
            s.disabled.apply_to("none")
        ),
    }
    if let Some(ref k) = config.coefficients {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Fixed coef."),
            s.method.apply_to(k)
        );
    }
    println!();

    let seg = &config.segmentation;
    println!("  {}", s.header.apply_to("Segmentation"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Radii"),
        s.value.apply_to(format!(
            "close {} / erode {} / open {}+{} / extend {}",
            seg.closing_radius,
            seg.erosion_radius,
            seg.opening_radius,
            seg.final_opening_radius,
            seg.extension_radius
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Labels"),
        s.method.apply_to(seg.connectivity)
    );
    println!();
}

fn print_failures(s: &Styles, failures: &[RegistrationFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("  {}", s.header.apply_to("Failed registrations"));
    for failure in failures {
        println!(
            "    {:<16}{}",
            s.label.apply_to(&failure.name),
            s.error.apply_to(&failure.message)
        );
    }
    println!();
}

pub fn print_crosstalk_report(report: &CrosstalkReport) {
    let s = Styles::new();
    print_title(&s, "Crosstalk coefficients");

    println!(
        "    {:<16}{:<6}{:>8}{:>8}{:>5}{:>10}{:>10}",
        s.label.apply_to("Registration"),
        s.label.apply_to("Type"),
        s.label.apply_to("D exp"),
        s.label.apply_to("A exp"),
        s.label.apply_to("k"),
        s.label.apply_to("Value"),
        s.label.apply_to("SD")
    );
    for row in &report.summary {
        let kind = match row.meta.kind {
            CalibrationKind::Donor => "D",
            CalibrationKind::Acceptor => "A",
        };
        println!(
            "    {:<16}{:<6}{:>8}{:>8}{:>5}{:>10}{:>10}",
            row.meta.name,
            kind,
            row.meta.donor_exposure,
            row.meta.acceptor_exposure,
            s.method.apply_to(row.coefficient),
            s.value.apply_to(format!("{:.4}", row.value)),
            format!("{:.4}", row.sd)
        );
    }
    println!();

    match report.coefficients() {
        Ok(k) => print_coefficients(&k),
        Err(e) => println!(
            "  {:<14}{}",
            s.header.apply_to("Average"),
            s.disabled.apply_to(e)
        ),
    }
    print_failures(&s, &report.failures);
}

pub fn print_bleach_error(message: &str) {
    let s = Styles::new();
    print_title(&s, "G factor");
    println!(
        "  {:<16}{}",
        s.label.apply_to("Skipped"),
        s.error.apply_to(message)
    );
    println!();
}

pub fn print_coefficients(coefficients: &CrosstalkCoefficients) {
    let s = Styles::new();
    println!("  {}", s.header.apply_to("Average"));
    for (name, value) in [
        ("a", coefficients.a),
        ("b", coefficients.b),
        ("c", coefficients.c),
        ("d", coefficients.d),
    ] {
        println!(
            "    {:<12}{}",
            s.label.apply_to(name),
            s.value.apply_to(format!("{value:.4}"))
        );
    }
    println!();
}

pub fn print_g_report(report: &GReport) {
    let s = Styles::new();
    print_title(&s, "G factor");

    println!(
        "    {:<16}{:>8}{:>10}{:>10}{:>10}{:>12}{:>10}{:>8}",
        s.label.apply_to("Registration"),
        s.label.apply_to("ROIs"),
        s.label.apply_to("G"),
        s.label.apply_to("SE"),
        s.label.apply_to("p"),
        s.label.apply_to("Intercept"),
        s.label.apply_to("p"),
        s.label.apply_to("R\u{b2}")
    );
    for row in &report.rows {
        let fit = &row.fit;
        println!(
            "    {:<16}{:>8}{:>10}{:>10}{:>10}{:>12}{:>10}{:>8}",
            row.name,
            row.regions,
            s.value.apply_to(format!("{:.3}", fit.slope)),
            format!("{:.3}", fit.slope_stderr),
            fmt_p(fit.slope_p),
            format!("{:.1}", fit.intercept),
            fmt_p(fit.intercept_p),
            format!("{:.4}", fit.r_squared())
        );
    }
    println!();

    if !report.rows.is_empty() {
        let (mean, sd) = report.mean_g();
        println!(
            "    {:<12}{}",
            s.label.apply_to("Mean G"),
            s.value.apply_to(format!("{mean:.3} \u{b1} {sd:.3}"))
        );
        println!();
    }
    print_failures(&s, &report.failures);
}
