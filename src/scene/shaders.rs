//! GLSL ES 3.00 programs, embedded at compile time.

use crate::gpu::ProgramSource;

macro_rules! program {
    ($label:literal, $vert:literal, $frag:literal) => {
        ProgramSource {
            label: $label,
            vertex: include_str!(concat!("glsl/", $vert)),
            fragment: include_str!(concat!("glsl/", $frag)),
        }
    };
}

/// Cross-fade of the two off-screen targets plus the iris mask.
pub const COMPOSITE: ProgramSource = program!("composite", "fullscreen.vert", "composite.frag");

pub const FLUID: ProgramSource = program!("fluid", "fullscreen.vert", "fluid.frag");

pub const FLAT: ProgramSource = program!("flat", "flat.vert", "flat.frag");
pub const FLAT_INSTANCED: ProgramSource = program!("flat-instanced", "instanced.vert", "flat.frag");
pub const SUN: ProgramSource = program!("sun", "flat.vert", "sun.frag");
pub const GRID: ProgramSource = program!("grid", "grid.vert", "grid.frag");
pub const STARS: ProgramSource = program!("stars", "stars.vert", "stars.frag");

pub const PETALS: ProgramSource = program!("petals", "petal.vert", "petal.frag");

pub const LIT: ProgramSource = program!("lit", "lit.vert", "lit.frag");

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ProgramSource; 9] = [
        COMPOSITE,
        FLUID,
        FLAT,
        FLAT_INSTANCED,
        SUN,
        GRID,
        STARS,
        PETALS,
        LIT,
    ];

    #[test]
    fn every_program_declares_its_version() {
        for program in ALL {
            assert!(program.vertex.starts_with("#version 300 es"), "{}", program.label);
            assert!(program.fragment.starts_with("#version 300 es"), "{}", program.label);
        }
    }

    #[test]
    fn fragment_inputs_are_fed_and_read() {
        for program in ALL {
            for line in program.fragment.lines() {
                let Some(decl) = line.strip_prefix("in ") else {
                    continue;
                };
                let decl = decl.trim_end_matches(';');
                let name = decl.rsplit(' ').next().unwrap_or(decl);
                assert!(
                    program.vertex.contains(&format!("out {decl};")),
                    "{}: vertex stage never writes {name}",
                    program.label
                );
                assert!(
                    program.fragment.matches(name).count() > 1,
                    "{}: {name} is declared but unused",
                    program.label
                );
            }
        }
    }
}
