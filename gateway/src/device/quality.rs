use std::str::FromStr;

use super::ModelFamily;
use crate::error::GatewayError;
use crate::protocol::Template;

/// 画质档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Low,
    Medium,
    High,
    Subscription,
    Insane,
}

impl FromStr for Quality {
    type Err = GatewayError;

    /// 大小写不敏感
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            "subscription" => Ok(Quality::Subscription),
            "insane" => Ok(Quality::Insane),
            other => Err(GatewayError::validation(format!(
                "unknown quality level: {}",
                other
            ))),
        }
    }
}

impl Quality {
    /// 返回 (raParams 模板, registerSet 模板)
    pub fn templates(self, family: ModelFamily) -> (Template, Template) {
        if family == ModelFamily::Floodlight {
            let register_set = match self {
                Quality::Low => Template::RegisterSetLowQualityFloodlight,
                Quality::Medium => Template::RegisterSetMediumQualityFloodlight,
                Quality::High | Quality::Subscription | Quality::Insane => {
                    Template::RegisterSetHighQualityFloodlight
                }
            };
            return (Template::RaParamsFloodlight, register_set);
        }

        match self {
            Quality::Low => (Template::RaParamsLowQuality, Template::RegisterSetLowQuality),
            Quality::Medium => (
                Template::RaParamsMediumQuality,
                Template::RegisterSetMediumQuality,
            ),
            Quality::High => (Template::RaParamsHighQuality, Template::RegisterSetHighQuality),
            Quality::Subscription => (
                Template::RaParamsSubscriptionQuality,
                Template::RegisterSetSubscriptionQuality,
            ),
            Quality::Insane => (
                Template::RaParamsInsaneQuality,
                Template::RegisterSetInsaneQuality,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("HiGh".parse::<Quality>().unwrap(), Quality::High);
        assert_eq!("INSANE".parse::<Quality>().unwrap(), Quality::Insane);
        assert!("ultra".parse::<Quality>().is_err());
        assert!("".parse::<Quality>().is_err());
    }

    #[test]
    fn floodlight_shares_parameter_template() {
        for quality in [
            Quality::Low,
            Quality::Medium,
            Quality::High,
            Quality::Subscription,
            Quality::Insane,
        ] {
            let (ra_params, _) = quality.templates(ModelFamily::Floodlight);
            assert_eq!(ra_params, Template::RaParamsFloodlight);
        }
        assert_eq!(
            Quality::Subscription.templates(ModelFamily::Floodlight).1,
            Template::RegisterSetHighQualityFloodlight
        );
        assert_eq!(
            Quality::Subscription.templates(ModelFamily::Standard),
            (
                Template::RaParamsSubscriptionQuality,
                Template::RegisterSetSubscriptionQuality
            )
        );
    }
}
