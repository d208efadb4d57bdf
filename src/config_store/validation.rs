// Write-time invariants for AutoscalingConfig. Collects every violation.

use crate::error::{StoreError, Violation};
use crate::models::AutoscalingConfig;

fn check_percent(violations: &mut Vec<Violation>, field: &str, value: f64) {
    if !(0.0..=100.0).contains(&value) {
        violations.push(Violation::new(
            field,
            format!("must be between 0 and 100, got {value}"),
        ));
    }
}

fn check_at_least_one(violations: &mut Vec<Violation>, field: &str, value: u64) {
    if value < 1 {
        violations.push(Violation::new(field, format!("must be >= 1, got {value}")));
    }
}

pub fn violations(config: &AutoscalingConfig) -> Vec<Violation> {
    let mut v = Vec::new();
    let m = &config.monitoring;
    let s = &config.scaling;

    if config.service_name.trim().is_empty() {
        v.push(Violation::new("serviceName", "is required"));
    } else if config.service_name.contains('/') {
        v.push(Violation::new("serviceName", "must not contain '/'"));
    }
    if config.template_id.trim().is_empty() {
        v.push(Violation::new("templateId", "is required"));
    }

    check_percent(&mut v, "monitoring.cpuThreshold", m.cpu_threshold);
    check_percent(&mut v, "monitoring.memoryThreshold", m.memory_threshold);
    check_percent(&mut v, "monitoring.scaleInCpuThreshold", m.scale_in_cpu_threshold);
    check_percent(
        &mut v,
        "monitoring.scaleInMemoryThreshold",
        m.scale_in_memory_threshold,
    );
    check_at_least_one(&mut v, "monitoring.duration", m.duration.into());
    check_at_least_one(&mut v, "monitoring.scaleInDuration", m.scale_in_duration.into());

    if m.scale_in_cpu_threshold >= m.cpu_threshold {
        v.push(Violation::new(
            "monitoring.scaleInCpuThreshold",
            format!(
                "must be below cpuThreshold ({} >= {})",
                m.scale_in_cpu_threshold, m.cpu_threshold
            ),
        ));
    }
    if m.scale_in_memory_threshold >= m.memory_threshold {
        v.push(Violation::new(
            "monitoring.scaleInMemoryThreshold",
            format!(
                "must be below memoryThreshold ({} >= {})",
                m.scale_in_memory_threshold, m.memory_threshold
            ),
        ));
    }
    if m.scale_in_duration <= m.duration {
        v.push(Violation::new(
            "monitoring.scaleInDuration",
            format!(
                "must be longer than duration ({} <= {})",
                m.scale_in_duration, m.duration
            ),
        ));
    }

    check_at_least_one(&mut v, "scaling.minVms", s.min_vms.into());
    check_at_least_one(&mut v, "scaling.maxVms", s.max_vms.into());
    if s.min_vms > s.max_vms {
        v.push(Violation::new(
            "scaling.minVms",
            format!("must be <= maxVms ({} > {})", s.min_vms, s.max_vms),
        ));
    }
    check_at_least_one(&mut v, "scaling.scaleOutStep", s.scale_out_step.into());
    check_at_least_one(&mut v, "scaling.scaleInStep", s.scale_in_step.into());
    if let Some(period) = s.cooldown_period {
        check_at_least_one(&mut v, "scaling.cooldownPeriod", period);
    }

    v
}

pub fn validate(config: &AutoscalingConfig) -> Result<(), StoreError> {
    let v = violations(config);
    if v.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(v))
    }
}
