use crate::types::SignalHeader;

/// Linear digital-to-physical transform of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    pub gain: f64,
    pub offset: f64,
}

impl CalibrationParams {
    /// 计算物理值转换参数
    ///
    /// Annotation channels carry text, not samples, and get the identity transform.
    pub fn from_signal(signal: &SignalHeader) -> Self {
        if signal.is_annotation() {
            return CalibrationParams { gain: 1.0, offset: 0.0 };
        }

        let gain = (signal.physical_max - signal.physical_min)
            / (signal.digital_max as f64 - signal.digital_min as f64);
        let offset = signal.physical_min - signal.digital_min as f64 * gain;

        CalibrationParams { gain, offset }
    }

    /// 将数字值转换为物理值
    pub fn to_physical(&self, digital_value: i32) -> f64 {
        digital_value as f64 * self.gain + self.offset
    }
}

/// Calibration of every channel, indexed by header position.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    params: Vec<CalibrationParams>,
}

impl CalibrationTable {
    pub fn new(signals: &[SignalHeader]) -> Self {
        CalibrationTable {
            params: signals.iter().map(CalibrationParams::from_signal).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&CalibrationParams> {
        self.params.get(index)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(pmin: f64, pmax: f64, dmin: i32, dmax: i32) -> SignalHeader {
        SignalHeader {
            label: "ECG".to_string(),
            transducer: String::new(),
            physical_dimension: "mV".to_string(),
            physical_min: pmin,
            physical_max: pmax,
            digital_min: dmin,
            digital_max: dmax,
            prefilter: String::new(),
            samples_per_record: 256,
        }
    }

    #[test]
    fn test_boundaries_map_exactly() {
        let cases = [
            signal(-500.0, 500.0, -2048, 2047),
            signal(-200.0, 200.0, -32768, 32767),
            signal(0.0, 3.3, 0, 4095),
            signal(-8388.608, 8388.607, -8388608, 8388607),
        ];

        for s in &cases {
            let cal = CalibrationParams::from_signal(s);
            assert!((cal.to_physical(s.digital_min) - s.physical_min).abs() < 1e-6);
            assert!((cal.to_physical(s.digital_max) - s.physical_max).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reference_gain() {
        let cal = CalibrationParams::from_signal(&signal(-500.0, 500.0, -2048, 2047));
        assert!((cal.gain - 1000.0 / 4095.0).abs() < 1e-12);

        let zero = cal.to_physical(0);
        let expected = -500.0 + 2048.0 * (1000.0 / 4095.0);
        assert!((zero - expected).abs() < 1e-9);
        assert!((zero - 0.1221).abs() < 1e-3);
    }

    #[test]
    fn test_annotation_identity() {
        let mut s = signal(-1.0, 1.0, -32768, 32767);
        s.label = "EDF Annotations".to_string();
        let table = CalibrationTable::new(&[s]);
        assert_eq!(table.get(0).unwrap().to_physical(42), 42.0);
        assert_eq!(table.len(), 1);
    }
}
