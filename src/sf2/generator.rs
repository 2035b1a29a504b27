//! SF2 generators: the `(operator, amount)` pairs that parameterize an
//! instrument zone.
//!
//! The 61-entry enumeration below mirrors the SoundFont 2 specification's
//! generator list one-to-one (same ordinal values as the reference C
//! implementation's `GenOperStrict`). Only a handful of operators drive
//! playback in this engine (`KeyRange`, `Pan`, `SampleId`,
//! `OverridingRootKey`) — the rest are kept so a generator stream can be
//! decoded and logged without silently losing data, and so instruments
//! that lean on generators we don't implement at least parse cleanly.

/// One raw `(operator, amount)` pair as read from an `igen` record.
#[derive(Debug, Clone, Copy)]
pub struct Generator {
    pub oper: u16,
    pub amount: GenAmount,
}

/// The union interpretation of a generator's 16-bit amount field.
///
/// SF2 generators reuse the same two raw bytes for three different
/// meanings depending on the operator: a `(lo, hi)` byte range, a signed
/// 16-bit integer, or an unsigned 16-bit integer. We store the raw bytes
/// and decode lazily via the accessors below, matching the reference
/// implementation's `GenAmount` union.
#[derive(Debug, Clone, Copy)]
pub struct GenAmount(pub [u8; 2]);

impl GenAmount {
    pub fn range(self) -> (u8, u8) {
        (self.0[0], self.0[1])
    }

    pub fn as_i16(self) -> i16 {
        i16::from_le_bytes(self.0)
    }

    pub fn as_u16(self) -> u16 {
        u16::from_le_bytes(self.0)
    }
}

/// The fixed 61-operator enumeration defined by the SF2 spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum GeneratorType {
    StartAddrsOffset = 0,
    EndAddrsOffset = 1,
    StartloopAddrsOffset = 2,
    EndloopAddrsOffset = 3,
    StartAddrsCoarseOffset = 4,
    ModLfoToPitch = 5,
    VibLfoToPitch = 6,
    ModEnvToPitch = 7,
    InitialFilterFc = 8,
    InitialFilterQ = 9,
    ModLfoToFilterFc = 10,
    ModEnvToFilterFc = 11,
    EndAddrsCoarseOffset = 12,
    ModLfoToVolume = 13,
    Unused1 = 14,
    ChorusEffectsSend = 15,
    ReverbEffectsSend = 16,
    Pan = 17,
    Unused2 = 18,
    Unused3 = 19,
    Unused4 = 20,
    DelayModLfo = 21,
    FreqModLfo = 22,
    DelayVibLfo = 23,
    FreqVibLfo = 24,
    DelayModEnv = 25,
    AttackModEnv = 26,
    HoldModEnv = 27,
    DecayModEnv = 28,
    SustainModEnv = 29,
    ReleaseModEnv = 30,
    KeynumToModEnvHold = 31,
    KeynumToModEnvDecay = 32,
    DelayVolEnv = 33,
    AttackVolEnv = 34,
    HoldVolEnv = 35,
    DecayVolEnv = 36,
    SustainVolEnv = 37,
    ReleaseVolEnv = 38,
    KeynumToVolEnvHold = 39,
    KeynumToVolEnvDecay = 40,
    Instrument = 41,
    Reserved1 = 42,
    KeyRange = 43,
    VelRange = 44,
    StartloopAddrsCoarseOffset = 45,
    Keynum = 46,
    Velocity = 47,
    InitialAttenuation = 48,
    Reserved2 = 49,
    EndloopAddrsCoarseOffset = 50,
    CoarseTune = 51,
    FineTune = 52,
    SampleId = 53,
    SampleModes = 54,
    Reserved3 = 55,
    ScaleTuning = 56,
    ExclusiveClass = 57,
    OverridingRootKey = 58,
    Unused5 = 59,
    EndOper = 60,
    /// Anything outside the 0..=60 range (shouldn't occur in valid files,
    /// but we decode defensively rather than treating it as fatal).
    Unknown(u16),
}

impl GeneratorType {
    pub fn from_oper(oper: u16) -> GeneratorType {
        use GeneratorType::*;
        match oper {
            0 => StartAddrsOffset,
            1 => EndAddrsOffset,
            2 => StartloopAddrsOffset,
            3 => EndloopAddrsOffset,
            4 => StartAddrsCoarseOffset,
            5 => ModLfoToPitch,
            6 => VibLfoToPitch,
            7 => ModEnvToPitch,
            8 => InitialFilterFc,
            9 => InitialFilterQ,
            10 => ModLfoToFilterFc,
            11 => ModEnvToFilterFc,
            12 => EndAddrsCoarseOffset,
            13 => ModLfoToVolume,
            14 => Unused1,
            15 => ChorusEffectsSend,
            16 => ReverbEffectsSend,
            17 => Pan,
            18 => Unused2,
            19 => Unused3,
            20 => Unused4,
            21 => DelayModLfo,
            22 => FreqModLfo,
            23 => DelayVibLfo,
            24 => FreqVibLfo,
            25 => DelayModEnv,
            26 => AttackModEnv,
            27 => HoldModEnv,
            28 => DecayModEnv,
            29 => SustainModEnv,
            30 => ReleaseModEnv,
            31 => KeynumToModEnvHold,
            32 => KeynumToModEnvDecay,
            33 => DelayVolEnv,
            34 => AttackVolEnv,
            35 => HoldVolEnv,
            36 => DecayVolEnv,
            37 => SustainVolEnv,
            38 => ReleaseVolEnv,
            39 => KeynumToVolEnvHold,
            40 => KeynumToVolEnvDecay,
            41 => Instrument,
            42 => Reserved1,
            43 => KeyRange,
            44 => VelRange,
            45 => StartloopAddrsCoarseOffset,
            46 => Keynum,
            47 => Velocity,
            48 => InitialAttenuation,
            49 => Reserved2,
            50 => EndloopAddrsCoarseOffset,
            51 => CoarseTune,
            52 => FineTune,
            53 => SampleId,
            54 => SampleModes,
            55 => Reserved3,
            56 => ScaleTuning,
            57 => ExclusiveClass,
            58 => OverridingRootKey,
            59 => Unused5,
            60 => EndOper,
            other => Unknown(other),
        }
    }

    /// Human-readable name, used only for `trace`-level diagnostic logging.
    pub fn name(self) -> &'static str {
        use GeneratorType::*;
        match self {
            StartAddrsOffset => "startAddrsOffset",
            EndAddrsOffset => "endAddrsOffset",
            StartloopAddrsOffset => "startloopAddrsOffset",
            EndloopAddrsOffset => "endloopAddrsOffset",
            StartAddrsCoarseOffset => "startAddrsCoarseOffset",
            ModLfoToPitch => "modLfoToPitch",
            VibLfoToPitch => "vibLfoToPitch",
            ModEnvToPitch => "modEnvToPitch",
            InitialFilterFc => "initialFilterFc",
            InitialFilterQ => "initialFilterQ",
            ModLfoToFilterFc => "modLfoToFilterFc",
            ModEnvToFilterFc => "modEnvToFilterFc",
            EndAddrsCoarseOffset => "endAddrsCoarseOffset",
            ModLfoToVolume => "modLfoToVolume",
            Unused1 => "unused1",
            ChorusEffectsSend => "chorusEffectsSend",
            ReverbEffectsSend => "reverbEffectsSend",
            Pan => "pan",
            Unused2 => "unused2",
            Unused3 => "unused3",
            Unused4 => "unused4",
            DelayModLfo => "delayModLFO",
            FreqModLfo => "freqModLFO",
            DelayVibLfo => "delayVibLFO",
            FreqVibLfo => "freqVibLFO",
            DelayModEnv => "delayModEnv",
            AttackModEnv => "attackModEnv",
            HoldModEnv => "holdModEnv",
            DecayModEnv => "decayModEnv",
            SustainModEnv => "sustainModEnv",
            ReleaseModEnv => "releaseModEnv",
            KeynumToModEnvHold => "keynumToModEnvHold",
            KeynumToModEnvDecay => "keynumToModEnvDecay",
            DelayVolEnv => "delayVolEnv",
            AttackVolEnv => "attackVolEnv",
            HoldVolEnv => "holdVolEnv",
            DecayVolEnv => "decayVolEnv",
            SustainVolEnv => "sustainVolEnv",
            ReleaseVolEnv => "releaseVolEnv",
            KeynumToVolEnvHold => "keynumToVolEnvHold",
            KeynumToVolEnvDecay => "keynumToVolEnvDecay",
            Instrument => "instrument",
            Reserved1 => "reserved1",
            KeyRange => "keyRange",
            VelRange => "velRange",
            StartloopAddrsCoarseOffset => "startloopAddrsCoarseOffset",
            Keynum => "keynum",
            Velocity => "velocity",
            InitialAttenuation => "initialAttenuation",
            Reserved2 => "reserved2",
            EndloopAddrsCoarseOffset => "endloopAddrsCoarseOffset",
            CoarseTune => "coarseTune",
            FineTune => "fineTune",
            SampleId => "sampleID",
            SampleModes => "sampleModes",
            Reserved3 => "reserved3",
            ScaleTuning => "scaleTuning",
            ExclusiveClass => "exclusiveClass",
            OverridingRootKey => "overridingRootKey",
            Unused5 => "unused5",
            EndOper => "endOper",
            Unknown(_) => "???",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_operators() {
        assert_eq!(GeneratorType::from_oper(43), GeneratorType::KeyRange);
        assert_eq!(GeneratorType::from_oper(17), GeneratorType::Pan);
        assert_eq!(GeneratorType::from_oper(53), GeneratorType::SampleId);
        assert_eq!(GeneratorType::from_oper(58), GeneratorType::OverridingRootKey);
        assert_eq!(GeneratorType::KeyRange.name(), "keyRange");
    }

    #[test]
    fn unknown_operator_is_not_fatal() {
        assert_eq!(GeneratorType::from_oper(9000), GeneratorType::Unknown(9000));
        assert_eq!(GeneratorType::Unknown(9000).name(), "???");
    }

    #[test]
    fn amount_decodes_as_range_signed_and_unsigned() {
        let amount = GenAmount([60, 72]);
        assert_eq!(amount.range(), (60, 72));

        let negative = GenAmount((-500i16).to_le_bytes());
        assert_eq!(negative.as_i16(), -500);

        let unsigned = GenAmount(12000u16.to_le_bytes());
        assert_eq!(unsigned.as_u16(), 12000);
    }
}
