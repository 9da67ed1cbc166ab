//! Prompt templates for file generation and build simulation.

use ba_protocol::ProjectFile;

/// Specification of one project file the model should generate.
#[derive(Debug, Clone, Copy)]
pub struct FilePrompt {
    pub name: &'static str,
    pub language: &'static str,
    pub description: &'static str,
}

/// The project skeleton, in generation order.
pub const FILE_PROMPTS: [FilePrompt; 6] = [
    FilePrompt {
        name: "README.md",
        language: "markdown",
        description: "Generate a comprehensive README.md file for a project that uses an AI agent \
            to build a minimal Linux OS with Buildroot. The README should first explain \"How to \
            Customize Your Linux System\" by editing 'configs/tiny_linux_defconfig' and a kernel \
            fragment file. It should then list prerequisites like build-essential and QEMU. \
            Finally, provide a \"Quick Start\" section explaining the steps: Generate, Setup, \
            Build, and Test.",
    },
    FilePrompt {
        name: "scripts/setup.sh",
        language: "bash",
        description: "Generate a bash script 'scripts/setup.sh'. It must be robust and path-aware, \
            defining a PROJECT_ROOT variable based on the script's location. It must start with \
            'set -e'. The script needs to create the following directories relative to \
            PROJECT_ROOT: buildroot/, configs/, board/, output/, scripts/. It should also create \
            a readme.txt inside the 'board/' directory. Finally, it must clone the latest stable \
            branch of Buildroot (e.g., 2024.02.x) into the 'buildroot/' directory.",
    },
    FilePrompt {
        name: "configs/tiny_linux_defconfig",
        language: "makefile",
        description: "Generate a Buildroot '.config' file named 'tiny_linux_defconfig'. It must \
            be the absolute minimum to boot a shell on x86_64.\n\
            - Set target architecture to x86_64.\n\
            - Use the default Buildroot glibc toolchain.\n\
            - Use BusyBox as the init system.\n\
            - Critically, include 'BR2_PACKAGE_BUSYBOX_STATIC_LINK=y' to prevent linking issues.\n\
            - Do NOT include any 'BR2_BUSYBOX_CONFIG_FRAGMENT_FILES' lines.\n\
            - Configure the output to be a compressed cpio initial ramdisk (initramfs).\n\
            - Enable the Linux kernel, using the latest stable version and 'tinyconfig' as a base.\n\
            - Do NOT include any bootloader like GRUB.\n\
            - Specify a kernel fragment file using \
            'BR2_LINUX_KERNEL_CONFIG_FRAGMENT_FILES=\"${CONFIG_DIR}/../configs/kernel_fragment.config\"'.",
    },
    FilePrompt {
        name: "configs/kernel_fragment.config",
        language: "makefile",
        description: "Generate a Linux kernel configuration fragment file named \
            'kernel_fragment.config'. This file will be merged with tinyconfig. It must contain \
            the following options, each set to '=y', to ensure the kernel can boot in QEMU and \
            provide a basic console:\n\
            - CONFIG_64BIT\n\
            - CONFIG_DEVTMPFS\n\
            - CONFIG_DEVTMPFS_MOUNT\n\
            - CONFIG_BINFMT_ELF\n\
            - CONFIG_BLK_DEV_INITRD\n\
            - CONFIG_TTY\n\
            - CONFIG_SERIAL_8250\n\
            - CONFIG_SERIAL_8250_CONSOLE\n\
            - CONFIG_PRINTK\n\
            - CONFIG_DRM\n\
            - CONFIG_DRM_FBDEV_EMULATION\n\
            - CONFIG_DRM_BOCHS",
    },
    FilePrompt {
        name: "scripts/build.sh",
        language: "bash",
        description: "Generate a bash script 'scripts/build.sh'. It must be robust and \
            path-aware, defining a PROJECT_ROOT. It must start with 'set -e'. It should perform a \
            clean, out-of-tree Buildroot build.\n\
            - The output directory must be '${PROJECT_ROOT}/output'.\n\
            - It must first run 'make' with the custom defconfig: 'make -C \
            \"${PROJECT_ROOT}/buildroot\" O=\"${PROJECT_ROOT}/output\" \
            defconfig=\"${PROJECT_ROOT}/configs/tiny_linux_defconfig\"'.\n\
            - Then, it must run the main build using all available processor cores: 'make -C \
            \"${PROJECT_ROOT}/buildroot\" O=\"${PROJECT_ROOT}/output\" -j$(nproc)'",
    },
    FilePrompt {
        name: "scripts/test.sh",
        language: "bash",
        description: "Generate a bash script 'scripts/test.sh'. It must be path-aware and start \
            with 'set -e'. It must launch the generated kernel and initramfs using QEMU.\n\
            - Define absolute paths for the kernel ('${PROJECT_ROOT}/output/images/bzImage') and \
            initramfs ('${PROJECT_ROOT}/output/images/rootfs.cpio.gz').\n\
            - Check if these files exist and exit with an error if they don't.\n\
            - Execute 'qemu-system-x86_64' with the kernel and initrd, appending 'console=ttyS0' \
            to the kernel command line, and using the '-nographic' option.",
    },
];

/// Prompt for generating one project file. The model must answer with the
/// raw file content only.
pub fn generation_prompt(spec: &FilePrompt) -> String {
    format!(
        "Generate a file named '{}' with the following purpose: {} Output only the raw content \
         of the file, with no explanation or code block formatting.",
        spec.name, spec.description
    )
}

/// Prompt simulating the execution of a setup or test script. The model
/// plays a sandboxed shell and streams plain terminal output.
pub fn execute_script_prompt(script: &ProjectFile) -> String {
    format!(
        "You are a sandboxed Linux shell environment. A user wants to execute the following \
         script: '{}'.\n\
         Provide a realistic, line-by-line log of what would happen if this script were executed.\n\
         Do not add any commentary, only the raw terminal output.\n\
         \n\
         The script content is:\n\
         ---\n\
         {}\n\
         ---",
        script.name, script.content
    )
}

/// Prompt simulating the full build: the model streams control markers for
/// logs, a scripted failure, analysis, a file fix, and final success.
pub fn build_prompt(
    build_script: &ProjectFile,
    defconfig: &ProjectFile,
    kernel_fragment: &ProjectFile,
) -> String {
    format!(
        "You are an AI developer agent simulating a Linux build process in a sandboxed \
         environment. You will execute a build script, encounter an error, diagnose it, fix it, \
         and retry successfully.\n\
         \n\
         Your response MUST be a stream of text containing special control tokens.\n\
         Control Tokens:\n\
         - [LOG]...[/LOG]: A block of standard terminal output.\n\
         - [ERROR]...[/ERROR]: A block of terminal output that represents a build failure.\n\
         - [ANALYSIS]...[/ANALYSIS]: Your analysis of the error as an AI agent.\n\
         - [FIX:path/to/file.ext]...[/FIX]: The complete, corrected content of the file that \
         needs to be fixed.\n\
         - [SUCCESS]: A token indicating the final build was successful.\n\
         \n\
         **The Scenario:**\n\
         The user provides a Buildroot config and a kernel fragment. The kernel fragment is \
         missing 'CONFIG_VIRTIO_CONSOLE=y', which will cause the kernel build to fail when a \
         certain driver is enabled. Your task is to simulate this failure.\n\
         \n\
         **Your Steps:**\n\
         1.  Start the build, streaming initial logs inside [LOG]...[/LOG] tokens.\n\
         2.  Simulate a build failure related to a missing 'CONFIG_VIRTIO_CONSOLE' dependency. \
         Stream the error messages inside [ERROR]...[/ERROR] tokens.\n\
         3.  Analyze the error. Your analysis inside [ANALYSIS]...[/ANALYSIS] should identify \
         the missing config option.\n\
         4.  Provide the complete, corrected content of '{fragment_name}' inside \
         [FIX:{fragment_name}]...[/FIX] tokens. The new content should be the original content \
         plus 'CONFIG_VIRTIO_CONSOLE=y'.\n\
         5.  Simulate the successful second build attempt, streaming logs inside [LOG]...[/LOG] \
         tokens.\n\
         6.  End with the [SUCCESS] token.\n\
         \n\
         **Input Files:**\n\
         ---\n\
         File: {build_name}\n\
         {build_content}\n\
         ---\n\
         File: {defconfig_name}\n\
         {defconfig_content}\n\
         ---\n\
         File: {fragment_name}\n\
         {fragment_content}\n\
         ---\n\
         Begin the simulation now.",
        fragment_name = kernel_fragment.name,
        fragment_content = kernel_fragment.content,
        build_name = build_script.name,
        build_content = build_script.content,
        defconfig_name = defconfig.name,
        defconfig_content = defconfig.content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_file_prompts_in_pipeline_order() {
        assert_eq!(FILE_PROMPTS.len(), 6);
        assert_eq!(FILE_PROMPTS[0].name, "README.md");
        assert_eq!(FILE_PROMPTS[1].name, "scripts/setup.sh");
        assert_eq!(FILE_PROMPTS[4].name, "scripts/build.sh");
        assert_eq!(FILE_PROMPTS[5].name, "scripts/test.sh");
    }

    #[test]
    fn generation_prompt_includes_name_and_purpose() {
        let prompt = generation_prompt(&FILE_PROMPTS[1]);
        assert!(prompt.contains("'scripts/setup.sh'"));
        assert!(prompt.contains("PROJECT_ROOT"));
        assert!(prompt.contains("Output only the raw content"));
    }

    #[test]
    fn execute_script_prompt_embeds_content() {
        let script = ProjectFile::new("scripts/test.sh", "bash", "set -e\nqemu-system-x86_64");
        let prompt = execute_script_prompt(&script);
        assert!(prompt.contains("'scripts/test.sh'"));
        assert!(prompt.contains("qemu-system-x86_64"));
        assert!(prompt.contains("only the raw terminal output"));
    }

    #[test]
    fn build_prompt_describes_control_tokens() {
        let build = ProjectFile::new("scripts/build.sh", "bash", "make");
        let defconfig = ProjectFile::new("configs/tiny_linux_defconfig", "makefile", "BR2=y");
        let fragment = ProjectFile::new("configs/kernel_fragment.config", "makefile", "CONFIG_TTY=y");

        let prompt = build_prompt(&build, &defconfig, &fragment);
        assert!(prompt.contains("[LOG]...[/LOG]"));
        assert!(prompt.contains("[FIX:path/to/file.ext]"));
        assert!(prompt.contains("[FIX:configs/kernel_fragment.config]"));
        assert!(prompt.contains("CONFIG_VIRTIO_CONSOLE"));
        assert!(prompt.contains("File: scripts/build.sh"));
        assert!(prompt.contains("File: configs/tiny_linux_defconfig"));
    }

    #[test]
    fn defconfig_prompt_pins_fragment_path() {
        let spec = &FILE_PROMPTS[2];
        assert!(spec
            .description
            .contains("BR2_LINUX_KERNEL_CONFIG_FRAGMENT_FILES"));
        assert!(spec.description.contains("kernel_fragment.config"));
    }
}
