//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::inference::Termination;
use crate::result::{FitQuality, ForceFit};

/// Format a ForceFit for human-readable terminal output.
pub fn format_fit(fit: &ForceFit) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("kpfm-bayes\n");
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');

    let hyper = fit.posterior.hyperparameters;
    output.push_str(&format!("  Samples: {}\n", fit.len()));
    output.push_str(&format!("  Quality: {}\n", format_quality(fit.quality())));
    output.push_str(&format!(
        "  Relative RMSE: {:.3}%   R\u{00b2} (quadratic): {:.4}\n",
        fit.relative_rmse * 100.0,
        fit.r_squared
    ));
    output.push('\n');

    output.push_str("    Hyperparameters:\n");
    output.push_str(&format!("      \u{03c6} (phase):        {:+.4} rad\n", hyper.phi));
    output.push_str(&format!("      \u{03c3} (force prior):  {:.4e}\n", hyper.sigma));
    output.push_str(&format!("      \u{03b3} (noise):        {:.4e}\n", hyper.gamma));
    output.push_str(&format!(
        "      Objective:          {:.4}\n",
        fit.posterior.objective
    ));
    output.push('\n');

    output.push_str(&format!(
        "    Force \u{2248} {:+.4e}\u{00b7}V\u{00b2} {:+.4e}\u{00b7}V {:+.4e}\n",
        fit.quadratic[0], fit.quadratic[1], fit.quadratic[2]
    ));
    output.push('\n');

    let starts = &fit.posterior.optimizer.starts;
    let converged = starts
        .iter()
        .filter(|s| s.termination == Termination::Converged)
        .count();
    output.push_str(&format!(
        "    Optimizer: {} starts, {} converged\n",
        starts.len(),
        converged
    ));
    if fit.posterior.optimizer.budget_exhausted {
        output.push_str(&format!(
            "    {}\n",
            "\u{26A0} Time budget exhausted before all starts finished"
                .yellow()
                .bold()
        ));
    }
    output.push('\n');

    output.push_str(&sep);
    output.push('\n');
    output.push_str(&format!(
        "Note: SNR {:.1} as configured; phase shift {:.3} rad used for the voltage axis.\n",
        fit.snr, fit.drive_phase_shift
    ));

    output
}

/// Format FitQuality for display.
fn format_quality(quality: FitQuality) -> String {
    match quality {
        FitQuality::Excellent => "Excellent".green().to_string(),
        FitQuality::Good => "Good".green().to_string(),
        FitQuality::Poor => "Poor".yellow().to_string(),
        FitQuality::Failed => "Failed".red().to_string(),
    }
}
